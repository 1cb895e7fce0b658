mod app;

use anyhow::Result;
use std::fs::{self, OpenOptions};

use cardforge_core::{
    config::{self, AppConfig},
    Composer, ExportWriter, MemorySurface, SelectionState,
};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    config::ensure_default_config()?;
    let config = AppConfig::load()?;

    let resolver = config.resolver()?;
    let selection = SelectionState::with_set(config.default_set.clone());
    let composer = Composer::with_selection(resolver, MemorySurface::card(), selection);
    let exporter = ExportWriter::new(config.export_dir.clone());

    let mut app = app::CardForgeApp::new(config, composer, exporter);
    app.run().await
}

fn init_logging() -> Result<()> {
    let log_dir = std::env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("cardforge.log");

    let env_filter = EnvFilter::from_default_env();

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(move || {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)
                .expect("failed to open log file")
        });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}
