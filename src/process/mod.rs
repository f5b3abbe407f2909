// src/process/mod.rs
pub mod date_parser;
pub mod extract;
pub mod schema;
pub mod utils;

pub use extract::{extract_report, ExtractedTable, ScanState};
pub use schema::{map_records, TradeRecord};

use crate::error::{Error, Result};
use calamine::{open_workbook_auto, DataType, Reader};
use csv::ReaderBuilder;
use std::path::Path;
use tracing::{debug, info};

/// A report sheet as rows of text cells. Every row has `width()` cells; an
/// absent cell is the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSheet {
    rows: Vec<Vec<String>>,
    width: usize,
}

impl RawSheet {
    /// Build a sheet, padding short rows to the widest one.
    pub fn from_rows(mut rows: Vec<Vec<String>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(width, String::new());
        }
        Self { rows, width }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell text, or `""` when the cell is absent.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Load the first worksheet of a report file.
///
/// `.xls`/`.xlsx`/`.xlsm`/`.xlsb`/`.ods` go through calamine; `.csv` dumps are
/// read headerless with ragged rows allowed.
#[tracing::instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn load_sheet<P: AsRef<Path>>(path: P) -> Result<RawSheet> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(Error::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let sheet = match ext.as_str() {
        "xls" | "xlsx" | "xlsm" | "xlsb" | "ods" => load_workbook(path)?,
        "csv" => load_csv(path)?,
        _ => {
            return Err(Error::UnsupportedFormat {
                path: path.to_path_buf(),
            })
        }
    };
    info!(rows = sheet.len(), width = sheet.width(), "sheet loaded");
    Ok(sheet)
}

fn load_workbook(path: &Path) -> Result<RawSheet> {
    let workbook_err = |e: calamine::Error| Error::Workbook {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let mut workbook = open_workbook_auto(path).map_err(workbook_err)?;
    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range.map_err(workbook_err)?,
        None => {
            return Err(Error::EmptyWorkbook {
                path: path.to_path_buf(),
            })
        }
    };

    // calamine trims leading empty rows/columns; restore them so that column
    // indices match the sheet's own lettering.
    let (row_offset, col_offset) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));
    debug!(row_offset, col_offset, "worksheet range origin");

    let mut rows: Vec<Vec<String>> = vec![Vec::new(); row_offset];
    for cells in range.rows() {
        let mut row = vec![String::new(); col_offset];
        row.extend(cells.iter().map(cell_to_string));
        rows.push(row);
    }
    Ok(RawSheet::from_rows(rows))
}

fn load_csv(path: &Path) -> Result<RawSheet> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(RawSheet::from_rows(rows))
}

fn cell_to_string(cell: &DataType) -> String {
    match cell {
        DataType::Empty | DataType::Error(_) => String::new(),
        DataType::String(s) => s.clone(),
        DataType::Float(f) => utils::format_float(*f),
        DataType::Int(i) => i.to_string(),
        DataType::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}
