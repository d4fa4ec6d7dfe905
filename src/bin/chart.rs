//! Native chart of a predictions CSV written by `stockcast train`/`evaluate`.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use stockcast::infrastructure::persistence::PredictionsStore;
use stockcast::interfaces::chart::ChartApp;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(author, version, about = "Plot actual vs predicted closes", long_about = None)]
struct Args {
    /// Predictions CSV (data/predictions/{TICKER}_{kind}_predictions.csv)
    predictions: PathBuf,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false).pretty())
        .init();

    let args = Args::parse();
    let records = PredictionsStore::load(&args.predictions)?;
    info!("Plotting {} predictions from {:?}", records.len(), args.predictions);

    let title = args
        .predictions
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("predictions")
        .to_string();
    let app = ChartApp::new(title.clone(), &records);

    let native_options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 700.0])
            .with_title(format!("stockcast: {}", title)),
        ..Default::default()
    };

    eframe::run_native(
        "stockcast chart",
        native_options,
        Box::new(|_cc| Ok(Box::new(app))),
    )
    .map_err(|e| anyhow::anyhow!("Eframe error: {}", e))?;

    Ok(())
}
