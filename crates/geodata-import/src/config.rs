//! Configuration management

use geodata_common::{GeoError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Defaults
// ============================================================================

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/geodata";

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default timeout for a single download in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 600;

/// User agent sent with every download.
pub const DEFAULT_USER_AGENT: &str = "geodata-import/0.1";

/// Prefix of every staging directory.
pub const DEFAULT_STAGING_PREFIX: &str = "geodata-";

/// INE province code list.
pub const DEFAULT_PROVINCES_URL: &str =
    "http://www.ine.es/daco/daco42/clasificaciones/codprov.xls";

/// INE 2011 census indicator descriptions (one indicator code per row).
pub const DEFAULT_CENSUS_INDICATORS_URL: &str =
    "http://www.ine.es/censos2011_datos/indicadores_seccen_rejilla.xls";

/// INE 2011 census indicators per census section, zipped CSV files.
pub const DEFAULT_CENSUS_DATA_URL: &str =
    "http://www.ine.es/censos2011_datos/indicadores_seccion_censal_csv.zip";

/// CNIG administrative boundaries, zipped shapefiles.
pub const DEFAULT_MUNICIPALITIES_URL: &str = "http://centrodedescargas.cnig.es/CentroDescargas/descargaDir?secDescDirLA=114023&pagActual=1&numTotReg=5&codSerieSel=CAANE";

/// External loader used for geometry datasets.
pub const DEFAULT_OGR2OGR: &str = "ogr2ogr";

/// Importer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    pub database: DatabaseConfig,
    pub staging: StagingConfig,
    pub http: HttpConfig,
    pub sources: SourceUrls,
    pub external: ExternalToolConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub connect_timeout_secs: u64,
}

/// Where staging directories are created
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagingConfig {
    /// Parent directory; `None` means the system temp dir
    pub base_dir: Option<PathBuf>,
    pub prefix: String,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            base_dir: None,
            prefix: DEFAULT_STAGING_PREFIX.to_string(),
        }
    }
}

/// Download client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Source locations of every dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceUrls {
    pub provinces: String,
    pub census_indicators: String,
    pub census_data: String,
    pub municipalities: String,
}

impl Default for SourceUrls {
    fn default() -> Self {
        Self {
            provinces: DEFAULT_PROVINCES_URL.to_string(),
            census_indicators: DEFAULT_CENSUS_INDICATORS_URL.to_string(),
            census_data: DEFAULT_CENSUS_DATA_URL.to_string(),
            municipalities: DEFAULT_MUNICIPALITIES_URL.to_string(),
        }
    }
}

/// External programs invoked by populators
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalToolConfig {
    pub ogr2ogr: String,
}

impl Default for ExternalToolConfig {
    fn default() -> Self {
        Self {
            ogr2ogr: DEFAULT_OGR2OGR.to_string(),
        }
    }
}

fn env_string(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_u64(name: &str, default: u64) -> Result<u64> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| GeoError::invalid_value(name, &value)),
        Err(_) => Ok(default),
    }
}

impl ImportConfig {
    /// Load configuration from `.env`, the environment and defaults
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Load configuration from the process environment only
    pub fn from_env() -> Result<Self> {
        let config = ImportConfig {
            database: DatabaseConfig {
                url: env_string("DATABASE_URL", DEFAULT_DATABASE_URL),
                connect_timeout_secs: env_u64(
                    "DATABASE_CONNECT_TIMEOUT",
                    DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                )?,
            },
            staging: StagingConfig {
                base_dir: std::env::var("GEODATA_STAGING_DIR").ok().map(PathBuf::from),
                prefix: DEFAULT_STAGING_PREFIX.to_string(),
            },
            http: HttpConfig {
                timeout_secs: env_u64("GEODATA_HTTP_TIMEOUT", DEFAULT_HTTP_TIMEOUT_SECS)?,
                user_agent: DEFAULT_USER_AGENT.to_string(),
            },
            sources: SourceUrls {
                provinces: env_string("GEODATA_PROVINCES_URL", DEFAULT_PROVINCES_URL),
                census_indicators: env_string(
                    "GEODATA_CENSUS_INDICATORS_URL",
                    DEFAULT_CENSUS_INDICATORS_URL,
                ),
                census_data: env_string("GEODATA_CENSUS_DATA_URL", DEFAULT_CENSUS_DATA_URL),
                municipalities: env_string(
                    "GEODATA_MUNICIPALITIES_URL",
                    DEFAULT_MUNICIPALITIES_URL,
                ),
            },
            external: ExternalToolConfig {
                ogr2ogr: env_string("GEODATA_OGR2OGR", DEFAULT_OGR2OGR),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.database.url.is_empty() {
            return Err(GeoError::config("Database URL cannot be empty"));
        }

        if self.database.connect_timeout_secs == 0 {
            return Err(GeoError::config("Database connect timeout must be greater than 0"));
        }

        if self.http.timeout_secs == 0 {
            return Err(GeoError::config("HTTP timeout must be greater than 0"));
        }

        let sources = [
            ("provinces", &self.sources.provinces),
            ("census indicators", &self.sources.census_indicators),
            ("census data", &self.sources.census_data),
            ("municipalities", &self.sources.municipalities),
        ];
        for (name, url) in sources {
            if url.trim().is_empty() {
                return Err(GeoError::config(format!("Source URL for {} cannot be empty", name)));
            }
        }

        if self.external.ogr2ogr.trim().is_empty() {
            return Err(GeoError::config("ogr2ogr program cannot be empty"));
        }

        Ok(())
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
            },
            staging: StagingConfig::default(),
            http: HttpConfig::default(),
            sources: SourceUrls::default(),
            external: ExternalToolConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ImportConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.http.timeout_secs, DEFAULT_HTTP_TIMEOUT_SECS);
        assert!(config.staging.base_dir.is_none());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = ImportConfig::default();
        config.http.timeout_secs = 0;
        assert!(matches!(config.validate(), Err(GeoError::Config(_))));
    }

    #[test]
    fn test_empty_source_rejected() {
        let mut config = ImportConfig::default();
        config.sources.census_data = "  ".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("census data"));
    }

    #[test]
    fn test_empty_loader_rejected() {
        let mut config = ImportConfig::default();
        config.external.ogr2ogr = String::new();
        assert!(config.validate().is_err());
    }
}
