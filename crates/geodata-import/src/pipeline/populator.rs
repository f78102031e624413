use async_trait::async_trait;

use super::context::ImportContext;
use super::schema::{IndexDef, StagedTable, TableSchema};
use crate::error::Result;

/// Outcome of the row-loading hook
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Source artifacts consumed (files, sheets)
    pub sources: usize,
    /// Rows written, when the loader can tell
    pub rows: Option<u64>,
}

impl LoadStats {
    pub fn new(sources: usize, rows: u64) -> Self {
        Self {
            sources,
            rows: Some(rows),
        }
    }

    /// Stats for loaders that cannot count rows (external tools)
    pub fn sources_only(sources: usize) -> Self {
        Self { sources, rows: None }
    }
}

/// Dataset-specific content of a staged table
///
/// The importer calls the hooks in order `define_schema`, `load_rows`,
/// `define_indexes`, all inside the pipeline transaction. Any error aborts
/// the import and rolls everything back.
#[async_trait]
pub trait TablePopulator: Send + Sync {
    type Descriptor: Send + Sync;

    /// Public table this dataset replaces
    fn target_table(&self) -> &str;

    /// Extensions the staged table depends on (`CREATE EXTENSION IF NOT EXISTS`)
    fn required_extensions(&self) -> &[&str] {
        &[]
    }

    /// Columns of the staged table, possibly derived from the descriptor
    async fn define_schema(
        &self,
        ctx: &mut ImportContext,
        descriptor: &Self::Descriptor,
    ) -> Result<TableSchema>;

    /// Fill the staged table from every source artifact in the descriptor
    ///
    /// Zero artifacts is valid and leaves the table empty.
    async fn load_rows(
        &self,
        ctx: &mut ImportContext,
        descriptor: &Self::Descriptor,
        table: &StagedTable,
    ) -> Result<LoadStats>;

    /// Keys and indexes created once the table is fully loaded
    fn define_indexes(&self, table: &StagedTable) -> Vec<IndexDef>;
}
