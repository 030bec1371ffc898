use std::path::PathBuf;

use argh::FromArgs;
use markerpose::{
    io::table::{write_twist_rows, Table},
    k3d::{aggregate, twist_tilt_decompose, REFERENCE_NORMAL, TARGET_NORMAL},
};

use super::{default_columns, parse_columns, parse_vector};

/// Print the mean surface normal of the rotation vectors of a pose table.
#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "normal")]
pub struct NormalArgs {
    /// a csv file with pose data
    #[argh(positional)]
    file: PathBuf,

    /// comma separated column names of the rotation vector
    #[argh(option, default = "default_columns()", from_str_fn(parse_columns))]
    cols: [String; 3],
}

/// Add the twist and tilt angles of each rotation vector to a pose table.
#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "twist")]
pub struct TwistArgs {
    /// a csv file with pose data
    #[argh(positional)]
    file: PathBuf,

    /// comma separated column names of the rotation vector
    #[argh(option, default = "default_columns()", from_str_fn(parse_columns))]
    cols: [String; 3],

    /// comma separated target normal
    #[argh(option, default = "TARGET_NORMAL", from_str_fn(parse_vector))]
    target: [f64; 3],

    /// output csv file, the table goes to stdout when absent
    #[argh(option, short = 'o')]
    output: Option<PathBuf>,
}

fn column_refs(cols: &[String; 3]) -> [&str; 3] {
    [cols[0].as_str(), cols[1].as_str(), cols[2].as_str()]
}

pub fn run_normal(args: NormalArgs) -> Result<(), Box<dyn std::error::Error>> {
    let table = Table::read(&args.file)?;
    let rvecs = table.vectors(column_refs(&args.cols))?;

    let estimate = aggregate(&rvecs)?;
    let [nx, ny, nz] = estimate.mean_normal;
    let [vx, vy, vz] = estimate.variance;
    println!("Vector (x,y,z): ({nx:.4} {ny:.4} {nz:.4})");
    println!("Variance (x,y,z): ({vx:.4} {vy:.4} {vz:.4})");

    Ok(())
}

pub fn run_twist(args: TwistArgs) -> Result<(), Box<dyn std::error::Error>> {
    let table = Table::read(&args.file)?;
    let rvecs = table.vectors(column_refs(&args.cols))?;

    let angles = rvecs
        .iter()
        .map(|rvec| twist_tilt_decompose(*rvec, args.target, REFERENCE_NORMAL))
        .collect::<Vec<_>>();

    let degenerate = angles.iter().filter(|a| a.is_err()).count();
    if degenerate > 0 {
        log::warn!("{degenerate} of {} rows have no twist angle", angles.len());
    }

    match &args.output {
        Some(path) => write_twist_rows(std::fs::File::create(path)?, &table, &angles)?,
        None => write_twist_rows(std::io::stdout().lock(), &table, &angles)?,
    }

    Ok(())
}
