use crate::error::Result;
use crate::process::date_parser::days_since_epoch;
use crate::process::schema::{ColumnSpec, SqlType, TRADE_COLUMNS};
use crate::process::TradeRecord;
use arrow::{
    array::{ArrayRef, Date32Array, Float64Array, Int32Array, Int64Array, StringArray},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::{fs, fs::File, path::Path, sync::Arc};
use tracing::info;

fn arrow_type(spec: &ColumnSpec) -> DataType {
    match spec.ty {
        SqlType::VarChar(_) => DataType::Utf8,
        SqlType::Integer => DataType::Int32,
        SqlType::BigInteger => DataType::Int64,
        SqlType::Float => DataType::Float64,
        SqlType::Date => DataType::Date32,
    }
}

/// Arrow schema mirroring `TRADE_COLUMNS`; only the date is non-nullable.
pub fn trade_schema() -> Schema {
    Schema::new(
        TRADE_COLUMNS
            .iter()
            .map(|c| Field::new(c.name, arrow_type(c), c.ty != SqlType::Date))
            .collect::<Vec<_>>(),
    )
}

fn strings<F>(records: &[TradeRecord], f: F) -> ArrayRef
where
    F: Fn(&TradeRecord) -> Option<&str>,
{
    Arc::new(records.iter().map(f).collect::<StringArray>())
}

/// Build one record batch holding every record.
pub fn to_record_batch(records: &[TradeRecord]) -> Result<RecordBatch> {
    let i32s = |f: fn(&TradeRecord) -> Option<i32>| -> ArrayRef {
        Arc::new(records.iter().map(f).collect::<Int32Array>())
    };
    let f64s = |f: fn(&TradeRecord) -> Option<f64>| -> ArrayRef {
        Arc::new(records.iter().map(f).collect::<Float64Array>())
    };

    let columns: Vec<ArrayRef> = vec![
        strings(records, |r| r.instrument_code.as_deref()),
        strings(records, |r| r.instrument_name.as_deref()),
        strings(records, |r| r.delivery_basis.as_deref()),
        i32s(|r| r.volume_units),
        Arc::new(records.iter().map(|r| r.volume_rub).collect::<Int64Array>()),
        f64s(|r| r.change_rub),
        f64s(|r| r.change_pct),
        f64s(|r| r.min_price),
        f64s(|r| r.mean_price),
        f64s(|r| r.max_price),
        f64s(|r| r.market_price),
        i32s(|r| r.best_offer),
        i32s(|r| r.best_bid),
        i32s(|r| r.contract_count),
        Arc::new(Date32Array::from(
            records
                .iter()
                .map(|r| days_since_epoch(r.trade_date))
                .collect::<Vec<_>>(),
        )),
        strings(records, |r| r.product.as_deref()),
    ];

    Ok(RecordBatch::try_new(Arc::new(trade_schema()), columns)?)
}

/// Write records to a SNAPPY-compressed Parquet file.
#[tracing::instrument(level = "info", skip(path, records), fields(path = %path.as_ref().display(), rows = records.len()))]
pub fn write_trades<P: AsRef<Path>>(path: P, records: &[TradeRecord]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let batch = to_record_batch(records)?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    info!("wrote trades parquet");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::extract::tests::mock_sheet;
    use crate::process::{extract_report, map_records};
    use arrow::array::Array;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use tempfile::tempdir;

    #[test]
    fn parquet_keeps_rows_and_types() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("Parsed_data.parquet");
        let records = map_records(&extract_report(&mock_sheet())?)?;

        write_trades(&path, &records)?;

        let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(&path)?)?.build()?;
        let mut rows = 0;
        for batch in reader {
            let batch = batch?;
            rows += batch.num_rows();
            assert_eq!(batch.num_columns(), TRADE_COLUMNS.len());
            assert_eq!(batch.schema().field(14).data_type(), &DataType::Date32);

            let change = batch
                .column(5)
                .as_any()
                .downcast_ref::<Float64Array>()
                .expect("float column");
            assert_eq!(change.null_count(), batch.num_rows());

            let dates = batch
                .column(14)
                .as_any()
                .downcast_ref::<Date32Array>()
                .expect("date column");
            assert_eq!(dates.value(0), days_since_epoch(records[0].trade_date));
        }
        assert_eq!(rows, records.len());
        Ok(())
    }

    #[test]
    fn schema_nullability() {
        let schema = trade_schema();
        assert!(schema.field(0).is_nullable());
        assert!(!schema.field(14).is_nullable());
        assert_eq!(schema.field(15).name(), "Товар");
    }
}
