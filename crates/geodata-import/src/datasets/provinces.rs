//! Province codes and names (INE `codprov`)
//!
//! The source is a single spreadsheet whose rows start with a numeric
//! province code followed by the province name. Header, title and blank
//! rows fail to parse as a code and are skipped.

use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use std::path::PathBuf;
use tracing::{debug, info, instrument};

use crate::download::{file_name_from_url, Downloader};
use crate::error::Result;
use crate::pipeline::{
    ColumnDef, DatasetProvider, ImportContext, IndexDef, LoadStats, StagedTable, TablePopulator,
    TableSchema,
};
use crate::spreadsheet::{read_sheets, Sheet};
use crate::staging::StagingArea;

pub const PROVINCES_TABLE: &str = "provinces_spain";

const DEFAULT_FILE_NAME: &str = "codprov.xls";

// Rows per INSERT statement
const INSERT_BATCH_SIZE: usize = 500;

/// Staged provinces spreadsheet
#[derive(Debug, Clone)]
pub struct ProvincesDescriptor {
    pub provinces_file: PathBuf,
}

/// Downloads the provinces spreadsheet
pub struct ProvincesProvider {
    downloader: Downloader,
    url: String,
}

impl ProvincesProvider {
    pub fn new(downloader: Downloader, url: impl Into<String>) -> Self {
        Self {
            downloader,
            url: url.into(),
        }
    }
}

#[async_trait]
impl DatasetProvider for ProvincesProvider {
    type Descriptor = ProvincesDescriptor;

    fn name(&self) -> &str {
        "provinces"
    }

    #[instrument(skip_all, fields(url = %self.url))]
    async fn prepare(&self, staging: &StagingArea) -> Result<ProvincesDescriptor> {
        let provinces_file = staging.file(&file_name_from_url(&self.url, DEFAULT_FILE_NAME));
        info!("Downloading provinces list");
        self.downloader.download_file(&self.url, &provinces_file).await?;

        Ok(ProvincesDescriptor { provinces_file })
    }
}

/// One parsed province row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Province {
    /// Two-digit zero-padded code
    pub code: String,
    pub name: String,
}

/// Parse a province code cell into its two-digit form
///
/// Spreadsheets store codes as numbers, so `"1"` and `"1.0"` both give
/// `"01"`. Anything that is not a whole number in `0..=99` is rejected.
pub fn parse_province_code(cell: &str) -> Option<String> {
    let cell = cell.trim();
    let code = match cell.parse::<u32>() {
        Ok(code) => code,
        Err(_) => {
            let value = cell.parse::<f64>().ok()?;
            if !value.is_finite() || value.fract() != 0.0 || value < 0.0 {
                return None;
            }
            value as u32
        },
    };

    (code <= 99).then(|| format!("{:02}", code))
}

/// Every well-formed province row across all sheets, in source order
pub fn parse_provinces(sheets: &[Sheet]) -> Vec<Province> {
    let mut provinces = Vec::new();
    for sheet in sheets {
        for row in &sheet.rows {
            let parsed = row
                .first()
                .and_then(|cell| parse_province_code(cell))
                .zip(row.get(1));
            match parsed {
                Some((code, name)) => provinces.push(Province {
                    code,
                    name: name.trim().to_string(),
                }),
                None => debug!(sheet = %sheet.name, ?row, "Skipping malformed province row"),
            }
        }
    }
    provinces
}

/// Loads `provinces_spain (cpro, province)`
#[derive(Debug, Clone, Default)]
pub struct ProvincesPopulator;

#[async_trait]
impl TablePopulator for ProvincesPopulator {
    type Descriptor = ProvincesDescriptor;

    fn target_table(&self) -> &str {
        PROVINCES_TABLE
    }

    async fn define_schema(
        &self,
        _ctx: &mut ImportContext,
        _descriptor: &ProvincesDescriptor,
    ) -> Result<TableSchema> {
        Ok(TableSchema::Columns(vec![
            ColumnDef::new("cpro", "CHAR(2) NOT NULL"),
            ColumnDef::new("province", "TEXT NOT NULL"),
        ]))
    }

    async fn load_rows(
        &self,
        ctx: &mut ImportContext,
        descriptor: &ProvincesDescriptor,
        table: &StagedTable,
    ) -> Result<LoadStats> {
        let sheets = read_sheets(&descriptor.provinces_file)?;
        let provinces = parse_provinces(&sheets);
        info!(provinces = provinces.len(), "Parsed provinces");

        let mut inserted = 0;
        for batch in provinces.chunks(INSERT_BATCH_SIZE) {
            let mut query_builder: QueryBuilder<Postgres> =
                QueryBuilder::new(format!("INSERT INTO {} (cpro, province) ", table.name()));
            query_builder.push_values(batch, |mut b, province| {
                b.push_bind(province.code.as_str())
                    .push_bind(province.name.as_str());
            });

            inserted += query_builder
                .build()
                .execute(ctx.connection()?)
                .await?
                .rows_affected();
        }

        Ok(LoadStats::new(sheets.len(), inserted))
    }

    fn define_indexes(&self, _table: &StagedTable) -> Vec<IndexDef> {
        vec![IndexDef::primary_key(["cpro"])]
    }
}
