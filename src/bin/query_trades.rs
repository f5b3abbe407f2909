use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use spimexscraper::{
    config::Config,
    db::TradeStore,
    output::delimited,
    query::{TradeFilter, TradeSummary},
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Filter stored trades and print headline statistics.
#[derive(Parser, Debug)]
struct Args {
    /// Parsed CSV to read; without it the configured database table is used
    #[arg(long)]
    csv: Option<PathBuf>,

    /// First trade date, YYYY-MM-DD
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last trade date, YYYY-MM-DD
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Instrument code (repeatable)
    #[arg(long = "instrument")]
    instruments: Vec<String>,

    /// Product (repeatable)
    #[arg(long = "product")]
    products: Vec<String>,

    #[arg(long)]
    min_price: Option<f64>,

    #[arg(long)]
    max_price: Option<f64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let records = match &args.csv {
        Some(path) => delimited::read_trades(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => {
            let cfg = Config::from_env()?;
            let db = cfg
                .database
                .as_ref()
                .context("no --csv given and DB_HOST is not set")?;
            let store = TradeStore::connect(&db.url()).await?;
            store.load_trades(&cfg.table_name).await?
        }
    };
    info!(loaded = records.len(), "records loaded");

    let filter = TradeFilter {
        start: args.from,
        end: args.to,
        instruments: args.instruments.into_iter().collect(),
        products: args.products.into_iter().collect(),
        min_price: args.min_price,
        max_price: args.max_price,
    };
    let kept = filter.apply(&records);
    let summary = TradeSummary::from_records(kept.iter().copied());

    println!("records:      {}", summary.records);
    println!("instruments:  {}", summary.instruments);
    match summary.average_price {
        Some(p) => println!("avg price:    {p:.0} RUB"),
        None => println!("avg price:    n/a"),
    }
    match summary.total_volume_rub {
        Some(v) => println!("total volume: {v} RUB"),
        None => println!("total volume: n/a"),
    }
    Ok(())
}
