//! Sheet/row access to tabular source files
//!
//! Populators only need cell text, so every format is flattened into
//! [`Sheet`]s of string rows. `.csv` files are read as a single sheet;
//! everything else goes through calamine (xls, xlsx, ods).

use calamine::{open_workbook_auto, Reader};
use std::path::Path;

use crate::error::Result;

/// One worksheet with every cell rendered as text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
}

/// Read every sheet of the file at `path`
pub fn read_sheets(path: &Path) -> Result<Vec<Sheet>> {
    if is_csv(path) {
        return read_csv_sheet(path).map(|sheet| vec![sheet]);
    }

    let mut workbook = open_workbook_auto(path)?;
    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook.worksheet_range(&name)?;
        let rows = range
            .rows()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect();
        sheets.push(Sheet::new(name, rows));
    }

    Ok(sheets)
}

fn read_csv_sheet(path: &Path) -> Result<Sheet> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(Sheet::new(name, rows))
}
