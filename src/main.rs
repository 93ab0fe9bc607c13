use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
use cli::Cli;

use tinymonth::storage::config::{APP_DIR, Config};

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();

    let cli = Cli::parse();
    if let Err(e) = cli::run(cli).await {
        tracing::error!("Command failed: {:#}", e);
        return Err(e);
    }

    Ok(())
}

fn setup_logging() {
    let log_dir = Config::config_dir();

    std::fs::create_dir_all(&log_dir).ok();

    let file_appender = tracing_appender::rolling::daily(log_dir, format!("{APP_DIR}.log"));
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .init();

    std::mem::forget(_guard);

    tracing::info!("{} started", APP_DIR);
}
