//! Shared helpers for database integration tests
//!
//! Tests run under `#[sqlx::test]`, which hands each test a fresh database
//! built from `DATABASE_URL`.

#![allow(dead_code)]

use anyhow::Result;
use geodata_import::config::StagingConfig;
use sqlx::PgPool;
use std::path::Path;

/// Whether a relation with this name exists in the search path
pub async fn table_exists(pool: &PgPool, name: &str) -> Result<bool> {
    let regclass: Option<String> = sqlx::query_scalar("SELECT to_regclass($1)::text")
        .bind(name)
        .fetch_one(pool)
        .await?;
    Ok(regclass.is_some())
}

pub async fn row_count(pool: &PgPool, table: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(&format!("SELECT count(*) FROM {}", table))
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Index names on `table`, sorted
pub async fn index_names(pool: &PgPool, table: &str) -> Result<Vec<String>> {
    let names = sqlx::query_scalar(
        "SELECT indexname::text FROM pg_indexes WHERE tablename = $1 ORDER BY indexname",
    )
    .bind(table)
    .fetch_all(pool)
    .await?;
    Ok(names)
}

/// Column names of `table` in ordinal order
pub async fn column_names(pool: &PgPool, table: &str) -> Result<Vec<String>> {
    let names = sqlx::query_scalar(
        "SELECT column_name::text FROM information_schema.columns \
         WHERE table_name = $1 ORDER BY ordinal_position",
    )
    .bind(table)
    .fetch_all(pool)
    .await?;
    Ok(names)
}

/// Staging configuration rooted in a test-owned directory
pub fn staging_in(dir: &Path) -> StagingConfig {
    StagingConfig {
        base_dir: Some(dir.to_path_buf()),
        prefix: "geodata-test-".to_string(),
    }
}

/// Entries left in a staging base directory
pub fn staging_leftovers(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}
