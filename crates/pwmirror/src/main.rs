mod cli;
mod commands;
mod console;
mod error;
mod output;
mod tokenize;

use clap::Parser;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

use pwmirror_api::LoopbackTransport;
use pwmirror_core::Session;

use crate::cli::{Cli, ColorMode, OutputFormat};
use crate::console::Console;
use crate::error::CliError;
use crate::output::{View, should_color};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

/// Logs go to stderr; stdout belongs to the console.
fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = pwmirror_config::load_config(cli.global.config.as_deref())?;

    let view = View {
        format: cli
            .global
            .output
            .unwrap_or_else(|| OutputFormat::from_config(&config.output)),
        color: should_color(
            cli.global
                .color
                .unwrap_or_else(|| ColorMode::from_config(&config.color)),
        ),
    };

    let mut session_config = config.session_config();
    if let Some(remote) = cli.global.remote {
        session_config.default_remote = remote;
    }
    tracing::debug!(?session_config, "session configured");

    let (session, events) = Session::new(Box::new(LoopbackTransport::new()), session_config);
    let mut console = Console::new(session, events, view);
    console.preload(&config.autoload_modules);

    if cli.command.is_empty() {
        console
            .interactive(BufReader::new(tokio::io::stdin()))
            .await
    } else {
        console.one_shot(&cli.command.join(" ")).await
    }
}
