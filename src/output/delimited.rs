use crate::error::Result;
use crate::process::{ExtractedTable, TradeRecord};
use csv::{ReaderBuilder, WriterBuilder};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

fn create(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(BufWriter::new(File::create(path)?))
}

/// Write the raw extracted table with its positional headers.
pub fn write_extracted<P: AsRef<Path>>(path: P, table: &ExtractedTable) -> Result<()> {
    let path = path.as_ref();
    let mut wtr = WriterBuilder::new().from_writer(create(path)?);
    wtr.write_record(&table.headers)?;
    for row in &table.rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    info!(path = %path.display(), rows = table.len(), "wrote extracted csv");
    Ok(())
}

/// Write typed records with the persisted column names as the header.
pub fn write_trades<P: AsRef<Path>>(path: P, records: &[TradeRecord]) -> Result<()> {
    let path = path.as_ref();
    let mut wtr = WriterBuilder::new().from_writer(create(path)?);
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    info!(path = %path.display(), rows = records.len(), "wrote trades csv");
    Ok(())
}

/// Read records written by [`write_trades`].
pub fn read_trades<P: AsRef<Path>>(path: P) -> Result<Vec<TradeRecord>> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let records = rdr
        .deserialize::<TradeRecord>()
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(records)
}
