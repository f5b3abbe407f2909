// src/history/mod.rs

use crate::error::Result;
use arrow::array::{ArrayRef, StringArray, TimestampMicrosecondArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::Utc;
use glob::glob;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::{
    collections::HashSet,
    fs,
    fs::File,
    path::PathBuf,
    sync::Arc,
};
use tracing::{debug, warn};

const LOADED: &str = "loaded";
const SEP: &str = "---";

/// Ledger of report files already loaded, one tiny Parquet file per event:
/// `<report>---loaded---<ts_micros>.parquet`.
pub struct History {
    history_dir: PathBuf,
}

impl History {
    /// Open the ledger at `history_dir`, creating the directory if needed.
    pub fn new(history_dir: impl Into<PathBuf>) -> Result<Self> {
        let history_dir = history_dir.into();
        fs::create_dir_all(&history_dir)?;
        Ok(Self { history_dir })
    }

    /// Record that `report` was loaded with `rows` records.
    pub fn record_loaded(&self, report: &str, rows: u64) -> Result<PathBuf> {
        let ts = Utc::now().timestamp_micros();
        let path = self
            .history_dir
            .join(format!("{report}{SEP}{LOADED}{SEP}{ts}.parquet"));

        let schema = Arc::new(Schema::new(vec![
            Field::new("report", DataType::Utf8, false),
            Field::new("event", DataType::Utf8, false),
            Field::new("rows", DataType::UInt64, false),
            Field::new(
                "event_time",
                DataType::Timestamp(TimeUnit::Microsecond, None),
                false,
            ),
        ]));
        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(vec![report.to_string()])),
            Arc::new(StringArray::from(vec![LOADED.to_string()])),
            Arc::new(UInt64Array::from(vec![rows])),
            Arc::new(TimestampMicrosecondArray::from(vec![ts])),
        ];
        let batch = RecordBatch::try_new(schema.clone(), columns)?;

        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let mut writer = ArrowWriter::try_new(File::create(&path)?, schema, Some(props))?;
        writer.write(&batch)?;
        writer.close()?;
        debug!(path = %path.display(), "history event written");
        Ok(path)
    }

    /// Names of every report with a `loaded` event.
    pub fn loaded_reports(&self) -> Result<HashSet<String>> {
        let mut set = HashSet::new();
        let pattern = format!("{}/*{SEP}{LOADED}{SEP}*.parquet", self.history_dir.display());
        let entries = match glob(&pattern) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(%pattern, error = %e, "bad history glob");
                return Ok(set);
            }
        };
        for path in entries.flatten() {
            if let Some(name) = path.file_name().and_then(|s| s.to_str()) {
                if let Some((report, _)) = name.split_once(SEP) {
                    set.insert(report.to_string());
                }
            }
        }
        Ok(set)
    }

    pub fn is_loaded(&self, report: &str) -> Result<bool> {
        Ok(self.loaded_reports()?.contains(report))
    }
}
