use std::process::ExitCode;

use clap::Parser;
use coursefetch_cli::Cli;
use coursefetch_cli::EXIT_CANCELLED;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr; stdout carries only listings and exports.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("received Ctrl-C, cancelling");
                shutdown.cancel();
            }
        }
    });

    match coursefetch_cli::run(cli, shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if coursefetch_cli::is_cancelled(&err) => {
            eprintln!("{err}");
            ExitCode::from(EXIT_CANCELLED)
        }
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
