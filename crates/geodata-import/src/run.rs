//! Sequential import of several datasets
//!
//! Datasets run one after another over a single pool. The first failure
//! stops the run: tables imported before it stay published, later datasets
//! are not attempted.

use sqlx::PgPool;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::config::ImportConfig;
use crate::datasets::{
    CensusPopulator, CensusProvider, DatasetKind, MunicipalitiesPopulator, MunicipalitiesProvider,
    ProvincesPopulator, ProvincesProvider,
};
use crate::db;
use crate::download::Downloader;
use crate::error::{ImportError, Result};
use crate::external::ExternalLoader;
use crate::pipeline::{AtomicTableImporter, ImportReport};

/// An ordered list of datasets to import
pub struct ImportRun {
    config: ImportConfig,
    datasets: Vec<DatasetKind>,
    downloader: Downloader,
    external_connection: Option<String>,
}

impl ImportRun {
    /// Prepare a run; `datasets` are imported in the given order
    pub fn new(config: ImportConfig, datasets: Vec<DatasetKind>) -> Result<Self> {
        let downloader = Downloader::new(&config.http)?;
        let external_connection = if datasets.contains(&DatasetKind::Municipalities) {
            Some(db::libpq_connection_string(&config.database.url)?)
        } else {
            None
        };

        Ok(Self {
            config,
            datasets,
            downloader,
            external_connection,
        })
    }

    /// Run with every dataset in the default order
    pub fn all(config: ImportConfig) -> Result<Self> {
        Self::new(config, DatasetKind::ALL.to_vec())
    }

    pub fn datasets(&self) -> &[DatasetKind] {
        &self.datasets
    }

    /// Import each dataset in order, stopping at the first failure
    #[instrument(skip_all, fields(run_id = %Uuid::new_v4()))]
    pub async fn execute(&self, pool: &PgPool) -> std::result::Result<Vec<ImportReport>, ImportError> {
        info!(datasets = ?self.datasets, "Starting import run");

        let mut reports = Vec::with_capacity(self.datasets.len());
        for kind in &self.datasets {
            match self.import(*kind, pool).await {
                Ok(report) => reports.push(report),
                Err(e) => {
                    error!(
                        dataset = %kind,
                        completed = reports.len(),
                        error = %e,
                        "Import run aborted"
                    );
                    return Err(e);
                },
            }
        }

        info!(datasets = reports.len(), "Import run complete");
        Ok(reports)
    }

    async fn import(
        &self,
        kind: DatasetKind,
        pool: &PgPool,
    ) -> std::result::Result<ImportReport, ImportError> {
        let sources = &self.config.sources;
        let staging = self.config.staging.clone();

        match kind {
            DatasetKind::Provinces => {
                let provider = ProvincesProvider::new(self.downloader.clone(), &sources.provinces);
                AtomicTableImporter::new(provider, ProvincesPopulator, staging)
                    .run(pool)
                    .await
            },
            DatasetKind::Census => {
                let provider = CensusProvider::new(
                    self.downloader.clone(),
                    &sources.census_indicators,
                    &sources.census_data,
                );
                AtomicTableImporter::new(provider, CensusPopulator, staging)
                    .run(pool)
                    .await
            },
            DatasetKind::Municipalities => {
                let provider =
                    MunicipalitiesProvider::new(self.downloader.clone(), &sources.municipalities);
                let populator =
                    MunicipalitiesPopulator::new(ExternalLoader::new(&self.config.external.ogr2ogr));
                let mut importer = AtomicTableImporter::new(provider, populator, staging);
                if let Some(connection) = &self.external_connection {
                    importer = importer.with_external_connection(connection.as_str());
                }
                importer.run(pool).await
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_external_connection_only_for_municipalities() {
        let config = ImportConfig::default();

        let run = ImportRun::new(config.clone(), vec![DatasetKind::Provinces]).unwrap();
        assert!(run.external_connection.is_none());

        let run = ImportRun::all(config).unwrap();
        assert_eq!(run.datasets(), &DatasetKind::ALL);
        assert_eq!(run.external_connection.as_deref(), Some("host=localhost dbname=geodata"));
    }

    #[test]
    fn test_rejects_non_url_database_for_external_loader() {
        let mut config = ImportConfig::default();
        config.database.url = "host=localhost dbname=geodata".to_string();

        assert!(ImportRun::new(config.clone(), vec![DatasetKind::Census]).is_ok());
        assert!(ImportRun::new(config, vec![DatasetKind::Municipalities]).is_err());
    }
}
