use async_trait::async_trait;

use crate::error::Result;
use crate::staging::StagingArea;

/// Fetches one dataset's raw sources into a staging area
///
/// Implementations write only below `staging` and never touch the database.
/// Every call receives a fresh staging area, so a retry never sees files
/// from an earlier attempt. On error no descriptor is produced.
#[async_trait]
pub trait DatasetProvider: Send + Sync {
    /// What the provider produced: staged artifact paths and/or parsed values
    type Descriptor: Send + Sync;

    /// Logical dataset name used in logs and errors
    fn name(&self) -> &str;

    async fn prepare(&self, staging: &StagingArea) -> Result<Self::Descriptor>;
}
