// src/pipeline.rs
use crate::output::{self, columnar, delimited};
use crate::process::{self, ExtractedTable, TradeRecord};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// Everything produced from one report file.
#[derive(Debug)]
pub struct ProcessedReport {
    pub report_name: String,
    pub table: ExtractedTable,
    pub records: Vec<TradeRecord>,
    pub extracted_csv: PathBuf,
    pub parsed_csv: PathBuf,
    pub parsed_parquet: PathBuf,
}

/// History key of a report: its file name.
pub fn report_name(report: &Path) -> String {
    report
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| report.display().to_string())
}

/// Load, extract, type and write one report into `out_dir`.
#[tracing::instrument(level = "info", skip(report, out_dir), fields(report = %report.as_ref().display()))]
pub fn process_report<P: AsRef<Path>, Q: AsRef<Path>>(report: P, out_dir: Q) -> Result<ProcessedReport> {
    let report = report.as_ref();
    let out_dir = out_dir.as_ref();
    let start = Instant::now();

    let report_name = report_name(report);

    let sheet = process::load_sheet(report)
        .with_context(|| format!("loading sheet {}", report.display()))?;
    let table = process::extract_report(&sheet)
        .with_context(|| format!("extracting trade table from {}", report_name))?;
    info!(rows = table.len(), trade_date = %table.trade_date_iso(), "extracted");

    let extracted_csv = out_dir.join(output::EXTRACTED_CSV);
    delimited::write_extracted(&extracted_csv, &table)
        .with_context(|| format!("writing {}", extracted_csv.display()))?;

    let records = process::map_records(&table).context("mapping rows onto trade schema")?;

    let parsed_csv = out_dir.join(output::PARSED_CSV);
    delimited::write_trades(&parsed_csv, &records)
        .with_context(|| format!("writing {}", parsed_csv.display()))?;
    let parsed_parquet = out_dir.join(output::PARSED_PARQUET);
    columnar::write_trades(&parsed_parquet, &records)
        .with_context(|| format!("writing {}", parsed_parquet.display()))?;

    info!(records = records.len(), elapsed = ?start.elapsed(), "report processed");
    Ok(ProcessedReport {
        report_name,
        table,
        records,
        extracted_csv,
        parsed_csv,
        parsed_parquet,
    })
}
