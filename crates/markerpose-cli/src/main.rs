use argh::FromArgs;

mod commands;

/// Detect fiducial markers, estimate their poses and aggregate surface normals.
#[derive(FromArgs, Debug)]
struct Args {
    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs, Debug)]
#[argh(subcommand)]
enum Command {
    Detect(commands::detect::DetectArgs),
    Normal(commands::normal::NormalArgs),
    Twist(commands::normal::TwistArgs),
    Capture(commands::capture::CaptureArgs),
    Generate(commands::generate::GenerateArgs),
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Args = argh::from_env();

    match args.command {
        Command::Detect(args) => commands::detect::run(args),
        Command::Normal(args) => commands::normal::run_normal(args),
        Command::Twist(args) => commands::normal::run_twist(args),
        Command::Capture(args) => commands::capture::run(args),
        Command::Generate(args) => commands::generate::run(args),
    }
}
