// Entrypoint for the CLI application.
// - Keeps `main` small: parse arguments, set up logging, run the publish.
// - Exit status is 0 only on success; each failure kind has its own code.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use portal_upload::cli::{Cli, Command, UploadArgs};
use portal_upload::logging::init_logging;
use portal_upload::tree::skip_hidden_and_symlinks;
use portal_upload::ui::Console;
use portal_upload::{publish_directory, PublishError};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let Command::Upload(args) = cli.command;
    let console = Console::new(args.verbose);

    match run(&args, &console) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            console.failure(&format!("{err:#}"));
            let code = err
                .downcast_ref::<PublishError>()
                .map(PublishError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

fn run(args: &UploadArgs, console: &Console) -> anyhow::Result<()> {
    init_logging(args.verbose)?;
    let config = args.to_config().context("invalid configuration")?;
    // Hidden entries and symbolic links are never uploaded.
    publish_directory(&config, &args.directory, &skip_hidden_and_symlinks, console)?;
    Ok(())
}
