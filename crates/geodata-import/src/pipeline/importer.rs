//! Atomic replacement of one public table
//!
//! The new version of a dataset is built under `_tmp_<target>` and swapped in
//! with a rename, all inside one transaction:
//!
//! ```text
//! Start -> Staged -> TempDropped -> TempCreated -> Populated
//!       -> TargetDropped -> Indexed -> Analyzed -> Published -> Committed
//! ```
//!
//! The public table is dropped only after the replacement is fully loaded,
//! and the drop is undone by the rollback if anything later fails. After a
//! rollback the staged table is dropped again on a separate autocommit
//! statement, since external loaders may have created it outside the
//! transaction. The staging area is released whatever the outcome.
//!
//! Constraints, indexes and sequences named after the staged table keep
//! their names through a table rename, so they are renamed to the public
//! prefix just before publishing.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

use super::context::ImportContext;
use super::populator::{LoadStats, TablePopulator};
use super::provider::DatasetProvider;
use super::schema::{validate_identifier, DependentRelation, StagedTable};
use super::stage::ImportStage;
use crate::config::StagingConfig;
use crate::error::{DatasetError, ImportError};
use crate::staging::StagingArea;

/// Summary of a successful dataset import
#[derive(Debug, Clone)]
pub struct ImportReport {
    pub dataset: String,
    pub table: String,
    pub sources: usize,
    pub rows: Option<u64>,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
}

/// Drives one provider/populator pair through the replacement state machine
pub struct AtomicTableImporter<P, T> {
    provider: P,
    populator: T,
    staging: StagingConfig,
    external_connection: Option<String>,
}

impl<P, T> AtomicTableImporter<P, T>
where
    P: DatasetProvider,
    T: TablePopulator<Descriptor = P::Descriptor>,
{
    pub fn new(provider: P, populator: T, staging: StagingConfig) -> Self {
        Self {
            provider,
            populator,
            staging,
            external_connection: None,
        }
    }

    /// libpq connection string handed to external loaders
    pub fn with_external_connection(mut self, connection: impl Into<String>) -> Self {
        self.external_connection = Some(connection.into());
        self
    }

    /// Import the dataset, replacing the public table on success
    ///
    /// On failure the public table is left exactly as it was and no staged
    /// table remains.
    #[instrument(
        skip_all,
        fields(dataset = %self.provider.name(), table = %self.populator.target_table())
    )]
    pub async fn run(&self, pool: &PgPool) -> Result<ImportReport, ImportError> {
        let started_at = Utc::now();
        let timer = Instant::now();
        info!("Starting dataset import");

        let table = StagedTable::new(self.populator.target_table())
            .map_err(|source| self.populate_error(ImportStage::Start, source))?;

        let staging =
            StagingArea::acquire(&self.staging).map_err(|source| ImportError::Staging {
                dataset: self.provider.name().to_string(),
                source,
            })?;

        let descriptor = match self.provider.prepare(&staging).await {
            Ok(descriptor) => descriptor,
            Err(source) => {
                error!(error = %source, "Dataset acquisition failed");
                return Err(ImportError::Acquisition {
                    dataset: self.provider.name().to_string(),
                    source,
                });
            },
        };

        let outcome = self.replace_table(pool, &table, &descriptor).await;
        staging.release();
        let stats = outcome?;

        let report = ImportReport {
            dataset: self.provider.name().to_string(),
            table: table.target().to_string(),
            sources: stats.sources,
            rows: stats.rows,
            started_at,
            duration: timer.elapsed(),
        };

        info!(
            sources = report.sources,
            rows = ?report.rows,
            "Dataset imported in {:.2}s",
            report.duration.as_secs_f64()
        );

        Ok(report)
    }

    async fn replace_table(
        &self,
        pool: &PgPool,
        table: &StagedTable,
        descriptor: &P::Descriptor,
    ) -> Result<LoadStats, ImportError> {
        let mut stage = ImportStage::Staged;
        let mut ctx = ImportContext::begin(pool, self.external_connection.clone())
            .await
            .map_err(|source| self.populate_error(stage, source))?;

        match self.drive(&mut ctx, table, descriptor, &mut stage).await {
            Ok(stats) => Ok(stats),
            Err(source) => {
                error!(stage = %stage, error = %source, "Import failed, rolling back");
                abort(&mut ctx, table).await;
                Err(self.populate_error(stage, source))
            },
        }
    }

    async fn drive(
        &self,
        ctx: &mut ImportContext,
        table: &StagedTable,
        descriptor: &P::Descriptor,
        stage: &mut ImportStage,
    ) -> Result<LoadStats, DatasetError> {
        ctx.execute(&table.drop_staged_sql()).await?;
        advance(stage, ImportStage::TempDropped);

        for extension in self.populator.required_extensions() {
            validate_identifier(extension)?;
            ctx.execute(&format!("CREATE EXTENSION IF NOT EXISTS {}", extension))
                .await?;
        }
        let schema = self.populator.define_schema(ctx, descriptor).await?;
        for statement in schema.create_statements(table)? {
            ctx.execute(&statement).await?;
        }
        advance(stage, ImportStage::TempCreated);

        let stats = self.populator.load_rows(ctx, descriptor, table).await?;
        info!(sources = stats.sources, rows = ?stats.rows, "Staged table loaded");
        advance(stage, ImportStage::Populated);

        ctx.execute(&table.drop_target_sql()).await?;
        advance(stage, ImportStage::TargetDropped);

        for index in self.populator.define_indexes(table) {
            ctx.execute(&index.create_sql(table)?).await?;
        }
        advance(stage, ImportStage::Indexed);

        ctx.execute(&table.analyze_sql()).await?;
        advance(stage, ImportStage::Analyzed);

        publish_dependent_names(ctx, table).await?;
        ctx.execute(&table.rename_sql()).await?;
        advance(stage, ImportStage::Published);

        ctx.commit().await?;
        advance(stage, ImportStage::Committed);

        Ok(stats)
    }

    fn populate_error(&self, stage: ImportStage, source: DatasetError) -> ImportError {
        ImportError::Populate {
            dataset: self.provider.name().to_string(),
            stage,
            source,
        }
    }
}

fn advance(stage: &mut ImportStage, next: ImportStage) {
    debug_assert_eq!(stage.next(), Some(next));
    *stage = next;
    debug!(stage = %next, "Stage reached");
}

/// Strip the staged prefix from constraints, indexes and sequences of the table
///
/// Runs after the public table is dropped, so the public names are free.
async fn publish_dependent_names(
    ctx: &mut ImportContext,
    table: &StagedTable,
) -> Result<(), DatasetError> {
    let constraints: Vec<String> = sqlx::query_scalar(
        "SELECT conname::text FROM pg_constraint \
         WHERE conrelid = to_regclass($1) ORDER BY conname",
    )
    .bind(table.name())
    .fetch_all(ctx.connection()?)
    .await?;

    // Renaming a key constraint renames its index as well
    for name in constraints {
        if let Some(public) = table.published_name(&name) {
            debug!(from = %name, to = %public, "Renaming constraint");
            ctx.execute(&table.rename_constraint_sql(&name, &public)).await?;
        }
    }

    let relations: Vec<(String, String)> = sqlx::query_as(
        "SELECT DISTINCT c.relname::text, c.relkind::text \
         FROM pg_depend d JOIN pg_class c ON c.oid = d.objid \
         WHERE d.classid = 'pg_class'::regclass \
           AND d.refobjid = to_regclass($1) \
           AND c.relkind IN ('i', 'S') \
         ORDER BY c.relname",
    )
    .bind(table.name())
    .fetch_all(ctx.connection()?)
    .await?;

    for (name, relkind) in relations {
        let (Some(kind), Some(public)) =
            (DependentRelation::from_relkind(&relkind), table.published_name(&name))
        else {
            continue;
        };
        debug!(from = %name, to = %public, ?kind, "Renaming dependent relation");
        ctx.execute(&kind.rename_sql(&name, &public)).await?;
    }

    Ok(())
}

/// Roll back, then drop whatever staged table is left. Never fails.
async fn abort(ctx: &mut ImportContext, table: &StagedTable) {
    if let Err(e) = ctx.rollback().await {
        warn!(error = %e, "Rollback failed");
    }

    match sqlx::raw_sql(&table.drop_staged_sql()).execute(ctx.pool()).await {
        Ok(_) => debug!(table = %table, "Staged table cleaned up"),
        Err(e) => warn!(table = %table, error = %e, "Failed to drop staged table after rollback"),
    }
}
