//! Database connection bootstrap

use geodata_common::{GeoError, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use url::Url;

use crate::config::DatabaseConfig;

/// Open the single connection every import in a run shares
///
/// The pool is capped at one connection so that statements from the
/// importer and its cleanup never run on two sessions at once.
pub async fn connect(config: &DatabaseConfig) -> std::result::Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .connect(&config.url)
        .await?;

    tracing::info!("Database connection established");

    Ok(pool)
}

fn push_pair(out: &mut Vec<String>, key: &str, value: &str) {
    if value.is_empty() {
        return;
    }
    let needs_quotes = value.chars().any(|c| c.is_whitespace() || c == '\'' || c == '\\');
    if needs_quotes {
        let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
        out.push(format!("{}='{}'", key, escaped));
    } else {
        out.push(format!("{}={}", key, value));
    }
}

fn decode(name: &str, raw: &str) -> Result<String> {
    urlencoding::decode(raw)
        .map(|value| value.into_owned())
        .map_err(|_| GeoError::invalid_value(name, raw))
}

/// Convert a `postgresql://` URL into a libpq `key=value` connection string
///
/// External loaders such as `ogr2ogr` take the keyword form
/// (`PG:host=... dbname=...`).
pub fn libpq_connection_string(database_url: &str) -> Result<String> {
    let url = Url::parse(database_url)
        .map_err(|e| GeoError::Parse(format!("Invalid database URL: {}", e)))?;

    if !matches!(url.scheme(), "postgres" | "postgresql") {
        return Err(GeoError::Parse(format!(
            "Unsupported database URL scheme '{}'",
            url.scheme()
        )));
    }

    let mut pairs = Vec::new();
    if let Some(host) = url.host_str() {
        push_pair(&mut pairs, "host", host);
    }
    if let Some(port) = url.port() {
        push_pair(&mut pairs, "port", &port.to_string());
    }
    let dbname = url.path().trim_start_matches('/');
    push_pair(&mut pairs, "dbname", &decode("dbname", dbname)?);
    push_pair(&mut pairs, "user", &decode("user", url.username())?);
    if let Some(password) = url.password() {
        push_pair(&mut pairs, "password", &decode("password", password)?);
    }
    for (key, value) in url.query_pairs() {
        push_pair(&mut pairs, &key, &value);
    }

    Ok(pairs.join(" "))
}
