//! 2011 census indicators per census section (INE)
//!
//! Two sources: a spreadsheet describing the indicators (`t1_1`, `t12_5`, ...)
//! and a zip of CSV files holding one row per census section. The indicator
//! list decides the table columns, so the schema is only known once the
//! description has been read.

use async_trait::async_trait;
use regex::Regex;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, info, instrument, warn};

use crate::archive::{extract_all, with_extension};
use crate::download::{file_name_from_url, Downloader};
use crate::error::{DatasetError, Result};
use crate::pipeline::{
    ColumnDef, DatasetProvider, ImportContext, IndexDef, LoadStats, StagedTable, TablePopulator,
    TableSchema,
};
use crate::spreadsheet::{read_sheets, Sheet};
use crate::staging::StagingArea;

pub const CENSUS_TABLE: &str = "census_spain";

/// Geographic key columns, in CSV order
pub const GEOGRAPHIC_KEYS: [(&str, &str); 5] = [
    ("ccaa", "CHAR(2) NOT NULL"),
    ("cpro", "CHAR(2) NOT NULL"),
    ("cmun", "CHAR(3) NOT NULL"),
    ("dist", "CHAR(2) NOT NULL"),
    ("secc", "CHAR(3) NOT NULL"),
];

const INDICATOR_COLUMN_TYPE: &str = "BIGINT";

const DEFAULT_DESCRIPTION_NAME: &str = "indicators.xls";
const DATA_ARCHIVE_NAME: &str = "census_csv.zip";
const DATA_DIR: &str = "census";

/// Staged census sources
#[derive(Debug, Clone)]
pub struct CensusDescriptor {
    pub description_file: PathBuf,
    pub csv_files: Vec<PathBuf>,
}

/// Downloads the indicator description and the census data archive
pub struct CensusProvider {
    downloader: Downloader,
    indicators_url: String,
    data_url: String,
}

impl CensusProvider {
    pub fn new(
        downloader: Downloader,
        indicators_url: impl Into<String>,
        data_url: impl Into<String>,
    ) -> Self {
        Self {
            downloader,
            indicators_url: indicators_url.into(),
            data_url: data_url.into(),
        }
    }
}

#[async_trait]
impl DatasetProvider for CensusProvider {
    type Descriptor = CensusDescriptor;

    fn name(&self) -> &str {
        "census"
    }

    #[instrument(skip_all)]
    async fn prepare(&self, staging: &StagingArea) -> Result<CensusDescriptor> {
        let description_file =
            staging.file(&file_name_from_url(&self.indicators_url, DEFAULT_DESCRIPTION_NAME));
        info!("Downloading indicators file");
        self.downloader
            .download_file(&self.indicators_url, &description_file)
            .await?;

        let archive = staging.file(DATA_ARCHIVE_NAME);
        info!("Downloading census data");
        self.downloader.download_file(&self.data_url, &archive).await?;

        info!("Extracting census data");
        let extracted = extract_all(&archive, &staging.file(DATA_DIR))?;
        let csv_files = with_extension(&extracted, "csv");
        debug!(files = csv_files.len(), "Census CSV files staged");

        Ok(CensusDescriptor {
            description_file,
            csv_files,
        })
    }
}

/// One census indicator column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Indicator {
    pub code: String,
    pub label: String,
}

/// Indicator rows from every sheet of the description file, in order
///
/// A row is an indicator when its first cell is a code like `t3_1`; the
/// second cell is its label. Codes repeated on later sheets are ignored.
pub fn indicators_from_sheets(sheets: &[Sheet]) -> Result<Vec<Indicator>> {
    let code_pattern = Regex::new(r"^t[0-9]+_[0-9]+$")
        .map_err(|e| DatasetError::Validation(format!("Invalid indicator pattern: {}", e)))?;
    let mut seen = HashSet::new();
    let mut indicators = Vec::new();

    for sheet in sheets {
        for row in &sheet.rows {
            let Some(code) = row.first().map(|c| c.trim()) else {
                continue;
            };
            if !code_pattern.is_match(code) {
                continue;
            }
            if !seen.insert(code.to_string()) {
                warn!(sheet = %sheet.name, code, "Duplicate indicator ignored");
                continue;
            }
            indicators.push(Indicator {
                code: code.to_string(),
                label: row.get(1).map(|l| l.trim().to_string()).unwrap_or_default(),
            });
        }
    }

    Ok(indicators)
}

/// Key columns followed by one commented BIGINT column per indicator
pub fn census_columns(indicators: &[Indicator]) -> Vec<ColumnDef> {
    GEOGRAPHIC_KEYS
        .iter()
        .map(|(name, sql_type)| ColumnDef::new(*name, *sql_type))
        .chain(indicators.iter().map(|indicator| {
            let column = ColumnDef::new(indicator.code.as_str(), INDICATOR_COLUMN_TYPE);
            if indicator.label.is_empty() {
                column
            } else {
                column.with_comment(indicator.label.as_str())
            }
        }))
        .collect()
}

/// Loads `census_spain` with bulk COPY from the staged CSV files
#[derive(Debug, Clone, Default)]
pub struct CensusPopulator;

#[async_trait]
impl TablePopulator for CensusPopulator {
    type Descriptor = CensusDescriptor;

    fn target_table(&self) -> &str {
        CENSUS_TABLE
    }

    async fn define_schema(
        &self,
        _ctx: &mut ImportContext,
        descriptor: &CensusDescriptor,
    ) -> Result<TableSchema> {
        let sheets = read_sheets(&descriptor.description_file)?;
        let indicators = indicators_from_sheets(&sheets)?;
        if indicators.is_empty() {
            return Err(DatasetError::Validation(format!(
                "No indicators found in {}",
                descriptor.description_file.display()
            )));
        }

        info!(indicators = indicators.len(), "Creating census table");
        Ok(TableSchema::Columns(census_columns(&indicators)))
    }

    async fn load_rows(
        &self,
        ctx: &mut ImportContext,
        descriptor: &CensusDescriptor,
        table: &StagedTable,
    ) -> Result<LoadStats> {
        let statement = format!(
            "COPY {} FROM STDIN WITH (FORMAT csv, HEADER true, NULL '')",
            table.name()
        );

        let mut total = 0;
        for path in &descriptor.csv_files {
            info!(
                "Importing data from: {}",
                path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default()
            );
            let file = tokio::fs::File::open(path).await?;

            let mut copy = ctx.connection()?.copy_in_raw(&statement).await?;
            let streamed = copy.read_from(file).await.map(|_| ());
            if let Err(e) = streamed {
                if let Err(abort_error) = copy.abort(e.to_string()).await {
                    debug!(error = %abort_error, "COPY aborted");
                }
                return Err(e.into());
            }
            let rows = copy.finish().await?;
            debug!(rows, file = %path.display(), "CSV file copied");
            total += rows;
        }

        Ok(LoadStats::new(descriptor.csv_files.len(), total))
    }

    fn define_indexes(&self, _table: &StagedTable) -> Vec<IndexDef> {
        vec![
            IndexDef::primary_key(["cpro", "cmun", "dist", "secc"]),
            IndexDef::index("province_municipality_idx", ["cpro", "cmun"]),
        ]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn sheet(name: &str, codes: &[&str]) -> Sheet {
        let mut rows = vec![row(&["Código", "Descripción"]), row(&[])];
        rows.extend(codes.iter().map(|code| row(&[code, &format!("Indicador {}", code)])));
        Sheet::new(name, rows)
    }

    #[test]
    fn test_indicators_across_sheets() {
        let sheets = vec![
            sheet("Personas", &["t1_1", "t2_1", "t2_2", "t3_1", "t4_1"]),
            sheet("Viviendas", &["t16_1", "t17_1", "t18_1"]),
        ];

        let indicators = indicators_from_sheets(&sheets).unwrap();
        let columns = census_columns(&indicators);

        assert_eq!(indicators.len(), 8);
        assert_eq!(columns.len(), 13);
        let names: Vec<_> = columns.iter().take(6).map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["ccaa", "cpro", "cmun", "dist", "secc", "t1_1"]);
        assert_eq!(columns[5].sql_type, "BIGINT");
        assert_eq!(columns[5].comment.as_deref(), Some("Indicador t1_1"));
        assert_eq!(columns[0].comment, None);
    }

    #[test]
    fn test_indicator_codes_must_match_fully() {
        let sheets = vec![Sheet::new(
            "s",
            vec![
                row(&["t1_1", "ok"]),
                row(&["xt1_1", "prefix"]),
                row(&["t1_1a", "suffix"]),
                row(&["T1_1", "upper"]),
                row(&["t1", "short"]),
                row(&["t22_13"]),
                row(&["t\u{0661}_1", "arabic-indic digit"]),
            ],
        )];

        let codes: Vec<_> = indicators_from_sheets(&sheets)
            .unwrap()
            .into_iter()
            .map(|i| (i.code, i.label))
            .collect();
        assert_eq!(
            codes,
            vec![
                ("t1_1".to_string(), "ok".to_string()),
                ("t22_13".to_string(), String::new())
            ]
        );
    }

    #[test]
    fn test_duplicate_codes_keep_first() {
        let sheets = vec![sheet("a", &["t1_1"]), sheet("b", &["t1_1", "t1_2"])];
        let codes: Vec<_> = indicators_from_sheets(&sheets)
            .unwrap()
            .into_iter()
            .map(|i| i.code)
            .collect();
        assert_eq!(codes, vec!["t1_1", "t1_2"]);
    }

    #[test]
    fn test_census_indexes() {
        let table = StagedTable::new(CENSUS_TABLE).unwrap();
        let indexes = CensusPopulator.define_indexes(&table);
        assert_eq!(indexes.len(), 2);
        assert_eq!(
            indexes[0],
            IndexDef::PrimaryKey(vec![
                "cpro".to_string(),
                "cmun".to_string(),
                "dist".to_string(),
                "secc".to_string()
            ])
        );
    }
}
