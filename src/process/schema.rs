//! Positional trade schema: column names, SQL types and the typed record.

use crate::error::{Error, Result};
use crate::process::{utils, ExtractedTable};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const INSTRUMENT_CODE: &str = "КодИнструмента";
pub const INSTRUMENT_NAME: &str = "НаименованиеИнструмента";
pub const DELIVERY_BASIS: &str = "БазисПоставки";
pub const VOLUME_UNITS: &str = "ОбъемДоговоровЕИ";
pub const VOLUME_RUB: &str = "ОбъемДоговоровРуб";
pub const CHANGE_RUB: &str = "ИзмРынРуб";
pub const CHANGE_PCT: &str = "ИзмРынПроц";
pub const MIN_PRICE: &str = "МинЦена";
pub const MEAN_PRICE: &str = "СреднЦена";
pub const MAX_PRICE: &str = "МаксЦена";
pub const MARKET_PRICE: &str = "РынЦена";
pub const BEST_OFFER: &str = "ЛучшПредложение";
pub const BEST_BID: &str = "ЛучшСпрос";
pub const CONTRACT_COUNT: &str = "КоличествоДоговоров";
pub const TRADE_DATE: &str = "Дата";
pub const PRODUCT: &str = "Товар";

/// Sheet columns consumed per row, after the leading row-number column.
pub const SOURCE_COLUMNS: usize = 14;
/// Positional fields including the attached date.
pub const POSITIONAL_FIELDS: usize = SOURCE_COLUMNS + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    VarChar(usize),
    Integer,
    BigInteger,
    Float,
    Date,
}

impl SqlType {
    pub fn ddl(&self) -> String {
        match self {
            SqlType::VarChar(n) => format!("VARCHAR({n})"),
            SqlType::Integer => "INTEGER".to_string(),
            SqlType::BigInteger => "BIGINT".to_string(),
            SqlType::Float => "DOUBLE PRECISION".to_string(),
            SqlType::Date => "DATE".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub ty: SqlType,
}

const fn col(name: &'static str, ty: SqlType) -> ColumnSpec {
    ColumnSpec { name, ty }
}

/// Persisted columns of `trade_data`, in insert order.
pub const TRADE_COLUMNS: [ColumnSpec; 16] = [
    col(INSTRUMENT_CODE, SqlType::VarChar(50)),
    col(INSTRUMENT_NAME, SqlType::VarChar(1000)),
    col(DELIVERY_BASIS, SqlType::VarChar(500)),
    col(VOLUME_UNITS, SqlType::Integer),
    col(VOLUME_RUB, SqlType::BigInteger),
    col(CHANGE_RUB, SqlType::Float),
    col(CHANGE_PCT, SqlType::Float),
    col(MIN_PRICE, SqlType::Float),
    col(MEAN_PRICE, SqlType::Float),
    col(MAX_PRICE, SqlType::Float),
    col(MARKET_PRICE, SqlType::Float),
    col(BEST_OFFER, SqlType::Integer),
    col(BEST_BID, SqlType::Integer),
    col(CONTRACT_COUNT, SqlType::Integer),
    col(TRADE_DATE, SqlType::Date),
    col(PRODUCT, SqlType::VarChar(200)),
];

/// One row of `trade_data`. Serde names are the persisted column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    #[serde(rename = "КодИнструмента")]
    pub instrument_code: Option<String>,
    #[serde(rename = "НаименованиеИнструмента")]
    pub instrument_name: Option<String>,
    #[serde(rename = "БазисПоставки")]
    pub delivery_basis: Option<String>,
    #[serde(rename = "ОбъемДоговоровЕИ")]
    pub volume_units: Option<i32>,
    #[serde(rename = "ОбъемДоговоровРуб")]
    pub volume_rub: Option<i64>,
    #[serde(rename = "ИзмРынРуб")]
    pub change_rub: Option<f64>,
    #[serde(rename = "ИзмРынПроц")]
    pub change_pct: Option<f64>,
    #[serde(rename = "МинЦена")]
    pub min_price: Option<f64>,
    #[serde(rename = "СреднЦена")]
    pub mean_price: Option<f64>,
    #[serde(rename = "МаксЦена")]
    pub max_price: Option<f64>,
    #[serde(rename = "РынЦена")]
    pub market_price: Option<f64>,
    #[serde(rename = "ЛучшПредложение")]
    pub best_offer: Option<i32>,
    #[serde(rename = "ЛучшСпрос")]
    pub best_bid: Option<i32>,
    #[serde(rename = "КоличествоДоговоров")]
    pub contract_count: Option<i32>,
    #[serde(rename = "Дата")]
    pub trade_date: NaiveDate,
    #[serde(rename = "Товар")]
    pub product: Option<String>,
}

/// Product name: the instrument name up to its first comma.
pub fn derive_product(instrument_name: &str) -> &str {
    utils::text_before_comma(instrument_name)
}

/// Rename and type every extracted row.
pub fn map_records(table: &ExtractedTable) -> Result<Vec<TradeRecord>> {
    let records = table
        .rows
        .iter()
        .enumerate()
        .map(|(idx, row)| map_row(idx, row, table.trade_date))
        .collect::<Result<Vec<_>>>()?;
    debug!(records = records.len(), "rows mapped onto trade schema");
    Ok(records)
}

/// `row` is one extracted row: the sheet cells followed by the date cell.
fn map_row(idx: usize, row: &[String], trade_date: NaiveDate) -> Result<TradeRecord> {
    // drop the row-number column; the trailing date cell counts as a field
    let fields = row.get(1..).unwrap_or_default();
    if fields.len() != POSITIONAL_FIELDS {
        return Err(Error::SchemaMismatch {
            row: idx,
            expected: POSITIONAL_FIELDS,
            found: fields.len(),
        });
    }
    let cell = |i: usize| fields[i].as_str();

    let instrument_name = text(idx, INSTRUMENT_NAME, cell(1), 1000)?;
    let product = instrument_name
        .as_deref()
        .map(|name| limit(idx, PRODUCT, derive_product(name), 200))
        .transpose()?;

    Ok(TradeRecord {
        instrument_code: text(idx, INSTRUMENT_CODE, cell(0), 50)?,
        instrument_name,
        delivery_basis: text(idx, DELIVERY_BASIS, cell(2), 500)?,
        volume_units: int(idx, VOLUME_UNITS, cell(3))?,
        volume_rub: int(idx, VOLUME_RUB, cell(4))?,
        change_rub: float(idx, CHANGE_RUB, cell(5))?,
        change_pct: float(idx, CHANGE_PCT, cell(6))?,
        min_price: float(idx, MIN_PRICE, cell(7))?,
        mean_price: float(idx, MEAN_PRICE, cell(8))?,
        max_price: float(idx, MAX_PRICE, cell(9))?,
        market_price: float(idx, MARKET_PRICE, cell(10))?,
        best_offer: int(idx, BEST_OFFER, cell(11))?,
        best_bid: int(idx, BEST_BID, cell(12))?,
        contract_count: int(idx, CONTRACT_COUNT, cell(13))?,
        trade_date,
        product,
    })
}

fn invalid(row: usize, column: &'static str, value: &str) -> Error {
    Error::InvalidValue {
        row,
        column,
        value: value.to_string(),
    }
}

fn limit(row: usize, column: &'static str, value: &str, max_chars: usize) -> Result<String> {
    if value.chars().count() > max_chars {
        return Err(invalid(row, column, value));
    }
    Ok(value.to_string())
}

fn text(row: usize, column: &'static str, raw: &str, max_chars: usize) -> Result<Option<String>> {
    if utils::is_null(raw) {
        return Ok(None);
    }
    limit(row, column, raw.trim(), max_chars).map(Some)
}

fn float(row: usize, column: &'static str, raw: &str) -> Result<Option<f64>> {
    utils::numeric_str(raw)
        .map(|s| s.parse::<f64>().map_err(|_| invalid(row, column, raw)))
        .transpose()
}

/// Integers may arrive as integral floats (`"60.0"`).
fn int<T: TryFrom<i64>>(row: usize, column: &'static str, raw: &str) -> Result<Option<T>> {
    let Some(s) = utils::numeric_str(raw) else {
        return Ok(None);
    };
    let wide = match s.parse::<i64>() {
        Ok(v) => v,
        Err(_) => {
            let f: f64 = s.parse().map_err(|_| invalid(row, column, raw))?;
            if !f.is_finite() || f.fract() != 0.0 || f.abs() > i64::MAX as f64 {
                return Err(invalid(row, column, raw));
            }
            f as i64
        }
    };
    T::try_from(wide)
        .map(Some)
        .map_err(|_| invalid(row, column, raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::extract::tests::{data, mock_sheet};
    use crate::process::extract_report;
    use pretty_assertions::assert_eq;

    fn table_with(rows: Vec<Vec<String>>) -> ExtractedTable {
        let trade_date = NaiveDate::from_ymd_opt(2025, 12, 10).unwrap();
        ExtractedTable {
            headers: Vec::new(),
            rows: rows
                .into_iter()
                .map(|mut r| {
                    r.push("2025-12-10".to_string());
                    r
                })
                .collect(),
            trade_date,
        }
    }

    #[test]
    fn maps_positional_fields() {
        let table = extract_report(&mock_sheet()).unwrap();
        let records = map_records(&table).unwrap();
        assert_eq!(records.len(), 6);

        let r = &records[0];
        assert_eq!(r.instrument_code.as_deref(), Some("A001NVY060F"));
        assert_eq!(r.delivery_basis.as_deref(), Some("Новая Чара"));
        assert_eq!(r.volume_units, Some(60));
        assert_eq!(r.volume_rub, Some(3_660_000));
        assert_eq!(r.change_rub, None);
        assert_eq!(r.change_pct, None);
        assert_eq!(r.mean_price, Some(61000.0));
        assert_eq!(r.best_offer, Some(60500));
        assert_eq!(r.best_bid, Some(61500));
        assert_eq!(r.contract_count, Some(1));
        assert_eq!(r.product.as_deref(), Some("Бензин (АИ-92-К5) 1"));
        assert_eq!(
            r.trade_date,
            NaiveDate::from_ymd_opt(2025, 12, 10).unwrap()
        );
    }

    #[test]
    fn product_is_text_before_first_comma() {
        assert_eq!(
            derive_product("Brent Crude Oil, January futures"),
            "Brent Crude Oil"
        );
        assert_eq!(derive_product("Brent Crude Oil"), "Brent Crude Oil");
    }

    #[test]
    fn null_name_gives_null_product() {
        let mut row = data(1);
        row[2] = "-".to_string();
        let records = map_records(&table_with(vec![row])).unwrap();
        assert_eq!(records[0].instrument_name, None);
        assert_eq!(records[0].product, None);
    }

    #[test]
    fn wrong_width_is_schema_mismatch() {
        let mut row = data(1);
        row.pop();
        let err = map_records(&table_with(vec![row])).unwrap_err();
        match err {
            Error::SchemaMismatch {
                row,
                expected,
                found,
            } => {
                assert_eq!((row, expected, found), (0, 15, 14));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn integral_floats_and_decimal_commas() {
        let mut row = data(1);
        row[4] = "60.0".to_string();
        row[6] = "-1 250,5".to_string();
        row[7] = "-2,01".to_string();
        let r = &map_records(&table_with(vec![row])).unwrap()[0];
        assert_eq!(r.volume_units, Some(60));
        assert_eq!(r.change_rub, Some(-1250.5));
        assert_eq!(r.change_pct, Some(-2.01));
    }

    #[test]
    fn garbage_number_names_column() {
        let mut row = data(1);
        row[14] = "one".to_string();
        let err = map_records(&table_with(vec![row])).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidValue {
                row: 0,
                column: CONTRACT_COUNT,
                ..
            }
        ));
    }

    #[test]
    fn integer_overflow_is_rejected() {
        let mut row = data(1);
        row[4] = "3000000000".to_string();
        assert!(map_records(&table_with(vec![row])).is_err());
    }

    #[test]
    fn overlong_code_is_rejected() {
        let mut row = data(1);
        row[1] = "X".repeat(51);
        assert!(matches!(
            map_records(&table_with(vec![row])),
            Err(Error::InvalidValue {
                column: INSTRUMENT_CODE,
                ..
            })
        ));
    }

    #[test]
    fn ddl_types() {
        let ddl: Vec<String> = TRADE_COLUMNS.iter().map(|c| c.ty.ddl()).collect();
        assert_eq!(ddl[0], "VARCHAR(50)");
        assert_eq!(ddl[4], "BIGINT");
        assert_eq!(ddl[5], "DOUBLE PRECISION");
        assert_eq!(ddl[14], "DATE");
        assert_eq!(TRADE_COLUMNS[15].name, PRODUCT);
    }
}
