//! Municipality boundaries (CNIG administrative boundaries shapefiles)
//!
//! Geometry is loaded by `ogr2ogr`, which opens its own database session
//! and creates the staged table itself.

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{info, instrument};

use crate::archive::{extract_matching, with_extension};
use crate::download::Downloader;
use crate::error::{DatasetError, Result};
use crate::external::{ogr2ogr_args, ExternalLoader};
use crate::pipeline::{
    DatasetProvider, ImportContext, IndexDef, LoadStats, StagedTable, TablePopulator, TableSchema,
};
use crate::staging::StagingArea;

pub const MUNICIPALITIES_TABLE: &str = "municipalities_spain";

/// Archive entries holding municipality layers
const MUNICIPALITY_LAYER_MARKER: &str = "_muni_";
/// Boundaries as of 2011-01-01, matching the census
const REFERENCE_DATE_MARKER: &str = "20110101";

const ARCHIVE_NAME: &str = "shapefiles.zip";
const SHAPES_DIR: &str = "shapes";

/// Column ogr2ogr writes geometry into
pub const GEOMETRY_COLUMN: &str = "geom";

const REQUIRED_EXTENSIONS: &[&str] = &["postgis", "postgis_topology"];

/// Whether an archive entry belongs to the municipality layer of 2011
pub fn is_municipality_entry(name: &str) -> bool {
    name.contains(MUNICIPALITY_LAYER_MARKER) && name.contains(REFERENCE_DATE_MARKER)
}

/// Staged shapefiles, each with its sidecar files next to it
#[derive(Debug, Clone)]
pub struct MunicipalitiesDescriptor {
    pub shapefiles: Vec<PathBuf>,
}

/// Downloads the boundaries archive and extracts the municipality layer
pub struct MunicipalitiesProvider {
    downloader: Downloader,
    url: String,
}

impl MunicipalitiesProvider {
    pub fn new(downloader: Downloader, url: impl Into<String>) -> Self {
        Self {
            downloader,
            url: url.into(),
        }
    }
}

#[async_trait]
impl DatasetProvider for MunicipalitiesProvider {
    type Descriptor = MunicipalitiesDescriptor;

    fn name(&self) -> &str {
        "municipalities"
    }

    #[instrument(skip_all)]
    async fn prepare(&self, staging: &StagingArea) -> Result<MunicipalitiesDescriptor> {
        let archive = staging.file(ARCHIVE_NAME);
        info!("Downloading municipality shapefiles");
        self.downloader.download_file(&self.url, &archive).await?;

        info!("Extracting municipality shapefiles");
        let extracted = extract_matching(&archive, &staging.file(SHAPES_DIR), is_municipality_entry)?;
        let shapefiles = with_extension(&extracted, "shp");
        if shapefiles.is_empty() {
            return Err(DatasetError::MissingArtifact(format!(
                "no municipality shapefiles in {}",
                self.url
            )));
        }

        Ok(MunicipalitiesDescriptor { shapefiles })
    }
}

/// Loads `municipalities_spain` through an external loader
#[derive(Debug, Clone)]
pub struct MunicipalitiesPopulator {
    loader: ExternalLoader,
}

impl MunicipalitiesPopulator {
    pub fn new(loader: ExternalLoader) -> Self {
        Self { loader }
    }
}

#[async_trait]
impl TablePopulator for MunicipalitiesPopulator {
    type Descriptor = MunicipalitiesDescriptor;

    fn target_table(&self) -> &str {
        MUNICIPALITIES_TABLE
    }

    fn required_extensions(&self) -> &[&str] {
        REQUIRED_EXTENSIONS
    }

    async fn define_schema(
        &self,
        _ctx: &mut ImportContext,
        _descriptor: &MunicipalitiesDescriptor,
    ) -> Result<TableSchema> {
        Ok(TableSchema::CreatedByLoader)
    }

    async fn load_rows(
        &self,
        ctx: &mut ImportContext,
        descriptor: &MunicipalitiesDescriptor,
        table: &StagedTable,
    ) -> Result<LoadStats> {
        // ogr2ogr connects separately and must not wait on our locks
        ctx.checkpoint().await?;
        let connection = ctx.external_connection()?;

        for (i, shapefile) in descriptor.shapefiles.iter().enumerate() {
            info!(
                "Importing municipalities from: {}",
                shapefile.file_name().map(|n| n.to_string_lossy()).unwrap_or_default()
            );
            let args = ogr2ogr_args(connection, table.name(), shapefile, i > 0);
            self.loader.run(&args).await?;
        }

        Ok(LoadStats::sources_only(descriptor.shapefiles.len()))
    }

    fn define_indexes(&self, table: &StagedTable) -> Vec<IndexDef> {
        vec![IndexDef::spatial(
            format!("{}_{}_idx", table.target(), GEOMETRY_COLUMN),
            GEOMETRY_COLUMN,
        )]
    }
}
