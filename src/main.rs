use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use neptune_thumb::{init_logging, run, RunOptions};

/// Injects a preview thumbnail and print-progress metadata into a
/// PrusaSlicer G-code file for Elegoo Neptune printers.
#[derive(Parser)]
#[command(name = "thumbnail", version)]
struct Cli {
    /// G-code file to be processed
    #[arg(value_name = "gcode-file")]
    input_file: PathBuf,

    /// Run for older Neptune printers
    #[arg(long)]
    old_printer: bool,

    /// Size of thumbnail to find in the G-code file (the first thumbnail of
    /// at least 100x100 is used if this option is not specified)
    #[arg(long, value_name = "WxH")]
    image_size: Option<String>,

    /// Use short print duration format (DDd HH:MM)
    #[arg(long)]
    short_duration_format: bool,

    /// Re-encode the annotated image into the embedded thumbnail block
    #[arg(long)]
    update_original_image: bool,

    /// Annotate for a light image background
    #[arg(long)]
    original_image_light_theme: bool,

    /// Save intermediate images and write additional log output
    #[arg(long)]
    debug: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.debug) {
        eprintln!("failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    let options = RunOptions {
        input_file: cli.input_file,
        old_printer: cli.old_printer,
        image_size: cli.image_size,
        short_duration_format: cli.short_duration_format,
        update_original_image: cli.update_original_image,
        light_theme: cli.original_image_light_theme,
        debug: cli.debug,
    };

    match run(&options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(
                "error occurred while processing {}: {:#}",
                options.input_file.display(),
                e
            );
            ExitCode::FAILURE
        }
    }
}
