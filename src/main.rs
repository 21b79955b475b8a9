// src/main.rs

use clap::Parser;
use essence_stats::cli::Args;
use essence_stats::renderer;
use essence_stats::stats::EssenceStats;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let start_time = Instant::now();

    let (stats_config, report_config) = match args.into_config() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let stats = match EssenceStats::new(&stats_config) {
        Ok(stats) => stats,
        Err(e) => {
            error!("Error collecting essence stats: {e}");
            return ExitCode::FAILURE;
        }
    };
    info!(
        "Analysis finished in {:.2?}. Found {} files, {} keywords, skipped {}.",
        start_time.elapsed(),
        stats.essence_files(None, false).len(),
        stats.essence_keywords(None, false).len(),
        stats.skipped().len()
    );

    if let Err(e) = renderer::write_report(&stats, &report_config) {
        error!("Error writing report to {}: {e}", report_config.output.display());
        return ExitCode::FAILURE;
    }

    info!("Total time: {:.2?}", start_time.elapsed());
    ExitCode::SUCCESS
}
