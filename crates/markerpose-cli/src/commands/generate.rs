use std::path::PathBuf;

use argh::FromArgs;
use markerpose::{
    aruco::Dictionary,
    image::{Image, ImageSize},
    io::functional::write_image_mono8,
};

/// Render a marker image.
#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "generate")]
pub struct GenerateArgs {
    /// dictionary id: 0 for 4x4_50, 1 for 4x4_100
    #[argh(option, short = 'd')]
    dictionary: i32,

    /// marker id
    #[argh(option, short = 'i')]
    id: u32,

    /// marker side in pixels
    #[argh(option, short = 's', default = "200")]
    size: usize,

    /// white margin around the marker in pixels
    #[argh(option, short = 'm', default = "0")]
    margin: usize,

    /// output image file
    #[argh(option, short = 'o')]
    output: PathBuf,
}

pub fn run(args: GenerateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let dictionary = Dictionary::from_id(args.dictionary)?;
    let marker = dictionary.render_marker(args.id, args.size)?;

    let side = args.size + 2 * args.margin;
    let mut image = Image::<u8, 1>::from_size_val(
        ImageSize {
            width: side,
            height: side,
        },
        255,
    )?;
    for y in 0..args.size {
        for x in 0..args.size {
            image.set_pixel(args.margin + x, args.margin + y, [marker.get_pixel(x, y, 0)?])?;
        }
    }

    write_image_mono8(&args.output, &image)?;
    log::info!("marker {} written to {}", args.id, args.output.display());

    Ok(())
}
