//! Error types for dataset imports
//!
//! [`DatasetError`] is what providers and populators return from their hooks.
//! [`ImportError`] is what the importer hands back to its caller, tagged with
//! the dataset and, for populate failures, the last state the table pipeline
//! reached before the failing transition.

use std::process::ExitStatus;
use thiserror::Error;

use crate::pipeline::ImportStage;

/// Result type for provider and populator hooks
pub type Result<T> = std::result::Result<T, DatasetError>;

/// Failure inside a dataset-specific hook
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Download error: {0}")]
    Download(#[from] reqwest::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("Expected artifact not found: {0}")]
    MissingArtifact(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("External tool '{program}' failed with {status}")]
    ExternalTool { program: String, status: ExitStatus },

    #[error("No open transaction on the import connection")]
    TransactionClosed,

    #[error(transparent)]
    Config(#[from] geodata_common::GeoError),
}

impl From<calamine::Error> for DatasetError {
    fn from(err: calamine::Error) -> Self {
        DatasetError::Spreadsheet(err.to_string())
    }
}

/// Failure of a whole dataset import
#[derive(Debug, Error)]
pub enum ImportError {
    /// The staging area could not be created
    #[error("Failed to create staging area for dataset '{dataset}': {source}")]
    Staging {
        dataset: String,
        #[source]
        source: std::io::Error,
    },

    /// The provider could not produce a descriptor; nothing was touched in the database
    #[error("Failed to acquire dataset '{dataset}': {source}")]
    Acquisition {
        dataset: String,
        #[source]
        source: DatasetError,
    },

    /// The table pipeline failed and was rolled back
    #[error("Failed to populate dataset '{dataset}' after stage {stage}: {source}")]
    Populate {
        dataset: String,
        stage: ImportStage,
        #[source]
        source: DatasetError,
    },
}

impl ImportError {
    /// Logical name of the dataset that failed
    pub fn dataset(&self) -> &str {
        match self {
            ImportError::Staging { dataset, .. }
            | ImportError::Acquisition { dataset, .. }
            | ImportError::Populate { dataset, .. } => dataset,
        }
    }

    /// Whether the failure happened before any database work started
    pub fn is_acquisition(&self) -> bool {
        matches!(self, ImportError::Staging { .. } | ImportError::Acquisition { .. })
    }
}
