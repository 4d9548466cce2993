use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{fmt, EnvFilter};

use unpack_subs::{ProcessOptions, DEFAULT_INFO_FILENAME, EXIT_FAILURE};

#[derive(Parser)]
#[command(name = "unpack-subs", version, about = "Sanely unzips course-management homework submission zip files")]
struct Cli {
    /// The zip file containing the submissions
    submissions_zipfile: PathBuf,

    /// Expand the submissions into this directory
    #[arg(default_value = ".")]
    output_directory: PathBuf,

    /// Name for each extracted submission info file (empty keeps the archive name)
    #[arg(long, default_value = DEFAULT_INFO_FILENAME)]
    info_name: String,

    /// Also write the run report as JSON to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// More log output (-v each problem as it happens, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) -> anyhow::Result<()> {
    let level = match verbose {
        0 => "error",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err.to_string()))
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut options = ProcessOptions::new(cli.submissions_zipfile)
        .with_output(cli.output_directory)
        .with_info_filename(cli.info_name);
    if let Some(path) = cli.report {
        options = options.with_report(path);
    }

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40}] {pos}/{len} {msg}")
            .unwrap(),
    );

    let result = unpack_subs::process(&options, &|_stage, current, total, message| {
        pb.set_length(total);
        pb.set_position(current);
        pb.set_message(message.to_string());
    });
    pb.finish_and_clear();

    let report = result?;
    report.render(&mut std::io::stderr().lock())?;
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = init_tracing(cli.verbose) {
        eprintln!("warning: logging disabled: {err}");
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
