//! rigup CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use rigup::cli::{Cli, CommandDispatcher, Output};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber for logging.
///
/// Log level is controlled by:
/// 1. `--debug` flag sets level to DEBUG
/// 2. `RUST_LOG` environment variable (if set)
/// 3. Default is INFO
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("rigup=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rigup=info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    tracing::debug!("rigup starting with args: {:?}", cli);

    let project_root = cli
        .project
        .as_ref()
        .cloned()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());

    let mut out = Output::new(cli.quiet);
    let dispatcher = CommandDispatcher::new(project_root);

    match dispatcher.dispatch(&cli, &mut out) {
        Ok(result) => ExitCode::from(result.exit_code as u8),
        Err(e) => {
            out.error(&format!("Error: {}", e));
            ExitCode::from(1)
        }
    }
}
