//! Execution context handed to every populate hook

use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tracing::debug;

use crate::error::{DatasetError, Result};

/// The import's open transaction plus what hooks need to reach the database
///
/// Exactly one context exists per table pipeline; hooks borrow it mutably,
/// so no other statement can run on the import connection meanwhile.
pub struct ImportContext {
    pool: PgPool,
    external_connection: Option<String>,
    tx: Option<Transaction<'static, Postgres>>,
}

impl ImportContext {
    /// Open the pipeline transaction
    pub(crate) async fn begin(pool: &PgPool, external_connection: Option<String>) -> Result<Self> {
        let tx = pool.begin().await?;
        Ok(Self {
            pool: pool.clone(),
            external_connection,
            tx: Some(tx),
        })
    }

    /// Connection inside the open transaction
    pub fn connection(&mut self) -> Result<&mut PgConnection> {
        self.tx.as_deref_mut().ok_or(DatasetError::TransactionClosed)
    }

    /// Run a single non-parameterised statement inside the transaction
    pub async fn execute(&mut self, sql: &str) -> Result<u64> {
        debug!(sql, "Executing statement");
        let result = sqlx::raw_sql(sql).execute(self.connection()?).await?;
        Ok(result.rows_affected())
    }

    /// libpq connection string for loaders that open their own session
    pub fn external_connection(&self) -> Result<&str> {
        self.external_connection.as_deref().ok_or_else(|| {
            DatasetError::Validation(
                "No connection string configured for external loaders".to_string(),
            )
        })
    }

    /// Commit everything so far and continue in a fresh transaction
    ///
    /// Used before handing the staged table to a loader on another session,
    /// which would otherwise block on locks this transaction holds. Work done
    /// before the checkpoint is no longer undone by a rollback, so it must
    /// not touch the public table.
    pub async fn checkpoint(&mut self) -> Result<()> {
        self.commit().await?;
        self.tx = Some(self.pool.begin().await?);
        debug!("Transaction checkpointed");
        Ok(())
    }

    pub(crate) async fn commit(&mut self) -> Result<()> {
        let tx = self.tx.take().ok_or(DatasetError::TransactionClosed)?;
        tx.commit().await?;
        Ok(())
    }

    /// Roll back the open transaction, if there still is one
    pub(crate) async fn rollback(&mut self) -> Result<()> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await?;
        }
        Ok(())
    }

    pub(crate) fn pool(&self) -> &PgPool {
        &self.pool
    }
}
