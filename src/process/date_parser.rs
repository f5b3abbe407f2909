use crate::error::{Error, Result};
use chrono::NaiveDate;

/// Parse the report's `"DD.MM.YYYY"` trade date.
///
/// The value must have exactly three dot-separated numeric parts forming a
/// real calendar date; anything else is `InvalidTradeDate`.
pub fn parse_trade_date(raw: &str) -> Result<NaiveDate> {
    let invalid = || Error::InvalidTradeDate {
        raw: raw.to_string(),
    };

    let parts: Vec<&str> = raw.trim().split('.').map(str::trim).collect();
    let [d, m, y] = parts.as_slice() else {
        return Err(invalid());
    };
    let day: u32 = d.parse().map_err(|_| invalid())?;
    let month: u32 = m.parse().map_err(|_| invalid())?;
    let year: i32 = y.parse().map_err(|_| invalid())?;

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

/// `YYYY-MM-DD`, the form attached to every extracted row.
pub fn format_iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Days since 1970-01-01, as stored in Arrow `Date32` columns.
pub fn days_since_epoch(date: NaiveDate) -> i32 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    date.signed_duration_since(epoch).num_days() as i32
}
