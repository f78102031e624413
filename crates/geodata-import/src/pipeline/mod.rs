//! Atomic dataset-replacement pipeline
//!
//! - **provider**: [`DatasetProvider`], fetches sources into a staging area
//! - **populator**: [`TablePopulator`], schema/rows/indexes of a staged table
//! - **importer**: [`AtomicTableImporter`], the replacement state machine
//! - **context**: [`ImportContext`], the transaction hooks run in
//! - **schema**: staged table names, column and index declarations

pub mod context;
pub mod importer;
pub mod populator;
pub mod provider;
pub mod schema;
pub mod stage;

pub use context::ImportContext;
pub use importer::{AtomicTableImporter, ImportReport};
pub use populator::{LoadStats, TablePopulator};
pub use provider::DatasetProvider;
pub use schema::{ColumnDef, IndexDef, StagedTable, TableSchema, STAGED_PREFIX};
pub use stage::ImportStage;
