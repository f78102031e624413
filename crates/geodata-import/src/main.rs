//! Geodata Import - replaces reference tables from their published sources

use anyhow::{Context, Result};
use clap::Parser;
use geodata_common::logging::{init_logging, LogConfig, LogLevel};
use geodata_import::{config::ImportConfig, db, DatasetKind, ImportRun};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "geodata-import")]
#[command(author, version, about = "Atomically replace geodata reference tables")]
struct Cli {
    /// Dataset to import; repeat for several. Defaults to all, in dependency order
    #[arg(short, long = "dataset", value_enum)]
    datasets: Vec<DatasetKind>,

    /// List known datasets and their tables, then exit
    #[arg(long)]
    list: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.list {
        for kind in DatasetKind::ALL {
            println!("{:<16} {}", kind.name(), kind.target_table());
        }
        return Ok(());
    }

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence over flags
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("geodata-import")
        .build()
        .merge_env()?;

    let _guard = init_logging(&log_config)?;

    let config = ImportConfig::load().context("Failed to load configuration")?;
    let datasets = if cli.datasets.is_empty() {
        DatasetKind::ALL.to_vec()
    } else {
        cli.datasets
    };

    let pool = db::connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    let run = ImportRun::new(config, datasets)?;

    let reports = run.execute(&pool).await?;
    for report in &reports {
        info!(
            dataset = %report.dataset,
            table = %report.table,
            sources = report.sources,
            rows = ?report.rows,
            "Replaced in {:.2}s",
            report.duration.as_secs_f64()
        );
    }

    pool.close().await;
    info!("Import complete");
    Ok(())
}
