//! Station server entry point: `wx-server [port]`.

use clap::Parser;
use wx_server::{NetworkConfig, Orchestrator};

/// wxstation server: accepts weather record pushes and serves fetches.
#[derive(Debug, Parser)]
#[command(name = "wx-server")]
struct Cli {
    /// Port to listen on.
    #[arg(default_value_t = 4567)]
    port: u16,

    /// Path to the persisted JSON record cache.
    #[arg(long, default_value = "weather.json")]
    cache_file: std::path::PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = NetworkConfig::default();
    config.port = cli.port;

    let mut orchestrator = Orchestrator::new(config, cli.cache_file);

    orchestrator.start().await?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("shutdown signal received");
        }
        () = orchestrator.wait_until_stopped() => {
            tracing::error!("server stopped unexpectedly");
        }
    }

    orchestrator.stop().await?;
    Ok(())
}
