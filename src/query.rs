//! Filtering and headline statistics over stored trade records.

use crate::process::TradeRecord;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashSet};

/// Record filter. Empty sets and `None` bounds do not restrict.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradeFilter {
    /// Inclusive.
    pub start: Option<NaiveDate>,
    /// Inclusive.
    pub end: Option<NaiveDate>,
    pub instruments: HashSet<String>,
    pub products: HashSet<String>,
    /// Bounds on the mean price; records without one fail any set bound.
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

impl TradeFilter {
    pub fn matches(&self, r: &TradeRecord) -> bool {
        if self.start.is_some_and(|s| r.trade_date < s) {
            return false;
        }
        if self.end.is_some_and(|e| r.trade_date > e) {
            return false;
        }
        if !in_set(&self.instruments, r.instrument_code.as_deref()) {
            return false;
        }
        if !in_set(&self.products, r.product.as_deref()) {
            return false;
        }
        if self.min_price.is_some() || self.max_price.is_some() {
            let Some(price) = r.mean_price else {
                return false;
            };
            if self.min_price.is_some_and(|m| price < m) {
                return false;
            }
            if self.max_price.is_some_and(|m| price > m) {
                return false;
            }
        }
        true
    }

    pub fn apply<'a>(&self, records: &'a [TradeRecord]) -> Vec<&'a TradeRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }
}

fn in_set(set: &HashSet<String>, value: Option<&str>) -> bool {
    set.is_empty() || value.is_some_and(|v| set.contains(v))
}

/// Record count, distinct instruments, mean price and total rouble volume.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeSummary {
    pub records: usize,
    pub instruments: usize,
    /// Mean of `СреднЦена` over records that have one.
    pub average_price: Option<f64>,
    /// Sum of `ОбъемДоговоровРуб` over records that have one.
    pub total_volume_rub: Option<i64>,
}

impl TradeSummary {
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a TradeRecord>,
    {
        let mut count = 0;
        let mut instruments = BTreeSet::new();
        let (mut price_sum, mut price_n) = (0.0, 0usize);
        let mut volume: Option<i64> = None;

        for r in records {
            count += 1;
            if let Some(code) = r.instrument_code.as_deref() {
                instruments.insert(code);
            }
            if let Some(p) = r.mean_price {
                price_sum += p;
                price_n += 1;
            }
            if let Some(v) = r.volume_rub {
                volume = Some(volume.unwrap_or(0).saturating_add(v));
            }
        }

        Self {
            records: count,
            instruments: instruments.len(),
            average_price: (price_n > 0).then(|| price_sum / price_n as f64),
            total_volume_rub: volume,
        }
    }
}
