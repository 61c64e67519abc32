//! graphgate - command-line access to the configured graph store.

mod commands;

use clap::Parser;
use tokio::signal;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use graphgate_core::Settings;
use graphgate_graph_stores::GraphStoreComponent;

use crate::commands::Cli;

/// Wait for Ctrl+C.
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::WARN.into())
                .from_env_lossy(),
        )
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    let component = GraphStoreComponent::new(&settings).await?;

    let result = tokio::select! {
        result = commands::run(&cli.command, &component) => result,
        _ = shutdown_signal() => {
            info!("Interrupted, closing graph store");
            Ok(())
        }
    };

    component.close().await;
    result
}
