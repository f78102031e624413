//! Geodata Import Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Atomic replacement of public reference tables (Spanish provinces, 2011
//! census indicators, municipality boundaries) from their published sources.
//!
//! Each dataset is downloaded into a private staging directory, loaded into
//! a `_tmp_` table inside one transaction, indexed, and renamed over the
//! public table. Readers see either the old table or the new one, never a
//! partial load.
//!
//! # Modules
//!
//! - **pipeline**: the replacement state machine and its provider/populator seams
//! - **datasets**: concrete provinces, census and municipalities datasets
//! - **run**: sequential import of several datasets
//!
//! # Example
//!
//! ```no_run
//! use geodata_import::{config::ImportConfig, db, ImportRun};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ImportConfig::load()?;
//!     let pool = db::connect(&config.database).await?;
//!     let reports = ImportRun::all(config)?.execute(&pool).await?;
//!     println!("{} tables replaced", reports.len());
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod config;
pub mod datasets;
pub mod db;
pub mod download;
pub mod error;
pub mod external;
pub mod pipeline;
pub mod run;
pub mod spreadsheet;
pub mod staging;

pub use config::ImportConfig;
pub use datasets::DatasetKind;
pub use error::{DatasetError, ImportError};
pub use pipeline::{AtomicTableImporter, DatasetProvider, ImportReport, TablePopulator};
pub use run::ImportRun;
pub use staging::StagingArea;
