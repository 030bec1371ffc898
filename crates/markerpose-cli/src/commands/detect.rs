use std::{
    path::{Path, PathBuf},
    sync::atomic::Ordering,
};

use argh::FromArgs;
use markerpose::{
    aruco::{annotate::draw_rejected_candidates, ArucoError, DetectorParameters, Dictionary, MarkerDetector},
    camera::CameraError,
    io::{
        calibration::read_calibration,
        functional::{read_image_any_rgb8, write_image_rgb8},
        params::read_detector_params,
        table::{write_pose_rows, write_pose_table, PoseRow},
    },
};

/// Detect markers in images and write their poses as CSV.
#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "detect")]
pub struct DetectArgs {
    /// camera calibration file
    #[argh(option, short = 'c')]
    camera_file: PathBuf,

    /// dictionary id: 0 for 4x4_50, 1 for 4x4_100
    #[argh(option, short = 'd')]
    dictionary: i32,

    /// detector parameters file
    #[argh(option, short = 'p')]
    detector_params: Option<PathBuf>,

    /// marker side length, in the unit of the output translations
    #[argh(option, short = 'l', default = "1.0")]
    length: f64,

    /// use the fisheye model regardless of the calibration file
    #[argh(switch)]
    fisheye: bool,

    /// the images are already undistorted
    #[argh(switch)]
    undistorted: bool,

    /// output csv file, the table goes to stdout when absent
    #[argh(option, short = 'o')]
    output: Option<PathBuf>,

    /// directory to write the annotated images to
    #[argh(option)]
    annotated_dir: Option<PathBuf>,

    /// also draw the rejected candidates on the annotated images
    #[argh(switch)]
    show_rejected: bool,

    /// input images
    #[argh(positional)]
    images: Vec<PathBuf>,
}

fn annotated_path(dir: &Path, image: &Path, index: usize) -> PathBuf {
    match image.file_stem() {
        Some(stem) => dir.join(Path::new(stem).with_extension("png")),
        None => dir.join(format!("img{index}.png")),
    }
}

pub fn run(args: DetectArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut camera = read_calibration(&args.camera_file)?;
    if args.fisheye && !camera.is_fisheye() {
        camera = camera.with_fisheye(true)?;
    }

    let params = match &args.detector_params {
        Some(path) => read_detector_params(path)?,
        None => DetectorParameters::default(),
    };
    let dictionary = Dictionary::from_id(args.dictionary)?;
    let detector = MarkerDetector::new(&camera, dictionary, params, args.length)?;

    if let Some(dir) = &args.annotated_dir {
        std::fs::create_dir_all(dir)?;
    }

    let cancel_token = super::cancel_token()?;

    let mut rows = Vec::new();
    for (i, path) in args.images.iter().enumerate() {
        if cancel_token.load(Ordering::SeqCst) {
            break;
        }

        let image = match read_image_any_rgb8(path) {
            Ok(image) => image,
            Err(err) => {
                log::warn!("skipping {}: {err}", path.display());
                continue;
            }
        };

        let report = match detector.detect_report(&image, args.undistorted) {
            Ok(report) => report,
            Err(ArucoError::Camera(err @ CameraError::SizeMismatch { .. })) => {
                log::warn!("skipping {}: {err}", path.display());
                continue;
            }
            Err(err) => return Err(err.into()),
        };

        log::info!(
            "{}: {} markers",
            path.display(),
            report.detections.len()
        );
        rows.extend(report.detections.iter().map(PoseRow::from));

        if let Some(dir) = &args.annotated_dir {
            let mut annotated = report.annotated;
            if args.show_rejected {
                draw_rejected_candidates(&mut annotated, &report.rejected);
            }
            write_image_rgb8(annotated_path(dir, path, i), &annotated)?;
        }
    }

    match &args.output {
        Some(path) => {
            write_pose_table(path, &rows)?;
            log::info!("{} poses written to {}", rows.len(), path.display());
        }
        None => write_pose_rows(std::io::stdout().lock(), &rows)?,
    }

    Ok(())
}
