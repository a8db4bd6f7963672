use anyhow::{Context, Result};
use clap::Parser;
use pasajes_tui::config::default_config_dir;
use pasajes_tui::launcher::{run_app, Cli, Settings};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout belongs to the terminal UI, so logs go to a file:
    // ~/.config/pasajes/pasajes.log, or ./pasajes.log without a home dir
    let log_file_path = cli.log_file.clone().unwrap_or_else(default_log_path);
    init_logging(&log_file_path)?;

    let settings = Settings::from_cli(&cli)?;
    tracing::info!(
        "[PasajesTui] Starting (offline: {}, log: {})",
        settings.offline,
        log_file_path.display()
    );

    run_app(settings).await
}

fn default_log_path() -> PathBuf {
    match default_config_dir() {
        Some(dir) if std::fs::create_dir_all(&dir).is_ok() => dir.join("pasajes.log"),
        _ => PathBuf::from("pasajes.log"),
    }
}

fn init_logging(path: &Path) -> Result<()> {
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Could not open log file {}", path.display()))?;

    // Default to INFO level, can be overridden with RUST_LOG env var
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(log_file).with_ansi(false))
        .init();

    Ok(())
}
