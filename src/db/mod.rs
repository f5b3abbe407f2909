use crate::error::{Error, Result};
use crate::process::schema::{self, TRADE_COLUMNS};
use crate::process::TradeRecord;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, QueryBuilder, Row};
use std::time::Duration;
use tracing::{debug, info};

/// Rows per multi-row INSERT; 16 binds each keeps well under Postgres' limit.
pub const INSERT_BATCH: usize = 1000;

/// Accept plain SQL identifiers only; table names are spliced into DDL.
pub fn validate_table_name(name: &str) -> Result<&str> {
    let mut chars = name.chars();
    let ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if ok {
        Ok(name)
    } else {
        Err(Error::InvalidTableName(name.to_string()))
    }
}

fn quoted(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn column_list() -> String {
    TRADE_COLUMNS
        .iter()
        .map(|c| quoted(c.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `CREATE TABLE IF NOT EXISTS` for the trade schema.
pub fn create_table_sql(table: &str) -> Result<String> {
    let table = validate_table_name(table)?;
    let cols = TRADE_COLUMNS
        .iter()
        .map(|c| format!("    {} {}", quoted(c.name), c.ty.ddl()))
        .collect::<Vec<_>>()
        .join(",\n");
    Ok(format!("CREATE TABLE IF NOT EXISTS {table} (\n{cols}\n)"))
}

/// Multi-row INSERT for one batch of records.
pub fn insert_query<'a>(table: &str, records: &'a [TradeRecord]) -> Result<QueryBuilder<'a, Postgres>> {
    let table = validate_table_name(table)?;
    let mut qb = QueryBuilder::new(format!("INSERT INTO {table} ({}) ", column_list()));
    qb.push_values(records, |mut b, r| {
        b.push_bind(r.instrument_code.clone())
            .push_bind(r.instrument_name.clone())
            .push_bind(r.delivery_basis.clone())
            .push_bind(r.volume_units)
            .push_bind(r.volume_rub)
            .push_bind(r.change_rub)
            .push_bind(r.change_pct)
            .push_bind(r.min_price)
            .push_bind(r.mean_price)
            .push_bind(r.max_price)
            .push_bind(r.market_price)
            .push_bind(r.best_offer)
            .push_bind(r.best_bid)
            .push_bind(r.contract_count)
            .push_bind(r.trade_date)
            .push_bind(r.product.clone());
    });
    Ok(qb)
}

/// Postgres-backed `trade_data` store.
#[derive(Clone)]
pub struct TradeStore {
    pool: PgPool,
}

impl TradeStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(Duration::from_secs(30))
            .connect(database_url)
            .await?;
        info!("connected to database");
        Ok(Self { pool })
    }

    pub async fn ensure_table(&self, table: &str) -> Result<()> {
        let ddl = create_table_sql(table)?;
        sqlx::query(&ddl).execute(&self.pool).await?;
        debug!(table, "table ensured");
        Ok(())
    }

    /// Append records in one transaction. Returns the number of rows inserted.
    #[tracing::instrument(level = "info", skip(self, records), fields(records = records.len()))]
    pub async fn insert_trades(&self, table: &str, records: &[TradeRecord]) -> Result<u64> {
        validate_table_name(table)?;
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;
        for chunk in records.chunks(INSERT_BATCH) {
            let mut qb = insert_query(table, chunk)?;
            inserted += qb.build().execute(&mut tx).await?.rows_affected();
        }
        tx.commit().await?;
        info!(inserted, "records appended");
        Ok(inserted)
    }

    /// Every stored record, newest trade date first.
    pub async fn load_trades(&self, table: &str) -> Result<Vec<TradeRecord>> {
        let table = validate_table_name(table)?;
        let sql = format!(
            "SELECT {} FROM {table} ORDER BY {} DESC",
            column_list(),
            quoted(schema::TRADE_DATE)
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(record_from_row).collect()
    }
}

fn record_from_row(row: &PgRow) -> Result<TradeRecord> {
    Ok(TradeRecord {
        instrument_code: row.try_get(schema::INSTRUMENT_CODE)?,
        instrument_name: row.try_get(schema::INSTRUMENT_NAME)?,
        delivery_basis: row.try_get(schema::DELIVERY_BASIS)?,
        volume_units: row.try_get(schema::VOLUME_UNITS)?,
        volume_rub: row.try_get(schema::VOLUME_RUB)?,
        change_rub: row.try_get(schema::CHANGE_RUB)?,
        change_pct: row.try_get(schema::CHANGE_PCT)?,
        min_price: row.try_get(schema::MIN_PRICE)?,
        mean_price: row.try_get(schema::MEAN_PRICE)?,
        max_price: row.try_get(schema::MAX_PRICE)?,
        market_price: row.try_get(schema::MARKET_PRICE)?,
        best_offer: row.try_get(schema::BEST_OFFER)?,
        best_bid: row.try_get(schema::BEST_BID)?,
        contract_count: row.try_get(schema::CONTRACT_COUNT)?,
        trade_date: row.try_get(schema::TRADE_DATE)?,
        product: row.try_get(schema::PRODUCT)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::extract::tests::mock_sheet;
    use crate::process::{extract_report, map_records};
    use sqlx::Execute;

    #[test]
    fn table_names_are_plain_identifiers() {
        assert!(validate_table_name("trade_data").is_ok());
        assert!(validate_table_name("_t2").is_ok());
        for bad in ["", "2tbl", "trade-data", "t; DROP TABLE x", "\"q\""] {
            assert!(validate_table_name(bad).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn ddl_quotes_every_column() {
        let ddl = create_table_sql("trade_data").unwrap();
        assert!(ddl.starts_with("CREATE TABLE IF NOT EXISTS trade_data ("));
        assert!(ddl.contains("\"КодИнструмента\" VARCHAR(50)"));
        assert!(ddl.contains("\"ОбъемДоговоровРуб\" BIGINT"));
        assert!(ddl.contains("\"Дата\" DATE"));
        assert!(ddl.contains("\"Товар\" VARCHAR(200)"));
        assert_eq!(ddl.matches(",\n").count(), TRADE_COLUMNS.len() - 1);
    }

    #[test]
    fn insert_binds_one_group_per_record() {
        let records = map_records(&extract_report(&mock_sheet()).unwrap()).unwrap();
        let mut qb = insert_query("trade_data", &records[..2]).unwrap();
        let query = qb.build();
        let sql = query.sql();
        assert!(sql.starts_with("INSERT INTO trade_data (\"КодИнструмента\", "));
        assert!(sql.contains("$1, $2"));
        assert!(sql.contains(&format!("${}", 2 * TRADE_COLUMNS.len())));
        assert!(!sql.contains(&format!("${}", 2 * TRADE_COLUMNS.len() + 1)));
    }

    #[test]
    fn insert_rejects_bad_table() {
        assert!(matches!(
            insert_query("bad name", &[]),
            Err(Error::InvalidTableName(_))
        ));
    }
}
