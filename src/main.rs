use anyhow::{bail, Context, Result};
use clap::Parser;
use reqwest::Client;
use spimexscraper::{
    config::Config, db::TradeStore, fetch, history::History, pipeline,
};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Download a SPIMEX trade-results report, extract its trade table and load
/// it into `trade_data`.
#[derive(Parser, Debug)]
#[command(name = "spimexscraper", version)]
struct Cli {
    /// Use a local report file instead of downloading one
    #[arg(long, conflicts_with = "url")]
    file: Option<PathBuf>,

    /// Report URL to download (default: newest link on the results page)
    #[arg(long)]
    url: Option<String>,

    #[arg(long)]
    out_dir: Option<PathBuf>,

    #[arg(long)]
    download_dir: Option<PathBuf>,

    #[arg(long)]
    history_dir: Option<PathBuf>,

    /// Skip the database load
    #[arg(long)]
    no_db: bool,

    /// Process the report even if it was loaded before
    #[arg(long)]
    force: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,spimexscraper=info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!("{e:#}");
        return Err(e);
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    // ─── 2) configuration ────────────────────────────────────────────
    let mut cfg = Config::from_env().context("reading configuration")?;
    if let Some(d) = &cli.out_dir {
        cfg.output_dir = d.clone();
    }
    if let Some(d) = &cli.download_dir {
        cfg.download_dir = d.clone();
    }
    if let Some(d) = &cli.history_dir {
        cfg.history_dir = d.clone();
    }
    info!(output = %cfg.output_dir.display(), table = %cfg.table_name, "startup");

    let history = History::new(&cfg.history_dir)
        .with_context(|| format!("opening history {}", cfg.history_dir.display()))?;

    // ─── 3) resolve the report file ──────────────────────────────────
    let Some(report_path) = resolve_report(&cli, &cfg, &history).await? else {
        return Ok(());
    };

    // ─── 4) extract + write outputs on the blocking pool ─────────────
    let out_dir = cfg.output_dir.clone();
    let path = report_path.clone();
    let processed = tokio::task::spawn_blocking(move || pipeline::process_report(&path, &out_dir))
        .await??;

    // ─── 5) load into the database ───────────────────────────────────
    match (&cfg.database, cli.no_db) {
        (_, true) => info!("database load disabled"),
        (None, false) => warn!("DB_HOST not set; skipping database load"),
        (Some(db), false) => {
            let store = TradeStore::connect(&db.url())
                .await
                .with_context(|| format!("connecting to {}:{}/{}", db.host, db.port, db.name))?;
            store.ensure_table(&cfg.table_name).await?;
            let inserted = store
                .insert_trades(&cfg.table_name, &processed.records)
                .await
                .with_context(|| format!("loading records into {}", cfg.table_name))?;
            info!(inserted, table = %cfg.table_name, "database load complete");
            history.record_loaded(&processed.report_name, inserted)?;
        }
    }

    info!(
        report = %report_path.display(),
        records = processed.records.len(),
        "all done"
    );
    Ok(())
}

/// The local or downloaded report to process, or `None` when that report was
/// loaded before and `--force` is off. Nothing is written in the `None` case.
async fn resolve_report(cli: &Cli, cfg: &Config, history: &History) -> Result<Option<PathBuf>> {
    if let Some(path) = &cli.file {
        let name = pipeline::report_name(path);
        if !cli.force && history.is_loaded(&name)? {
            info!(report = %name, "already loaded; use --force to reprocess");
            return Ok(None);
        }
        return Ok(Some(path.clone()));
    }

    let client = Client::new();
    let url = match cli.url.clone().or_else(|| cfg.report_url.clone()) {
        Some(url) => url,
        None => {
            let links = fetch::fetch_report_urls(&client, &cfg.results_page)
                .await
                .with_context(|| format!("listing reports on {}", cfg.results_page))?;
            match links.into_iter().next() {
                Some(url) => url.to_string(),
                None => bail!("no report links found on {}", cfg.results_page),
            }
        }
    };
    let name = fetch::report::report_file_name(&url::Url::parse(&url)?);
    if !cli.force && history.is_loaded(&name)? {
        info!(report = %name, "already loaded; use --force to reprocess");
        return Ok(None);
    }
    let path = fetch::download_report(&client, &url, &cfg.download_dir)
        .await
        .with_context(|| format!("downloading {url}"))?;
    Ok(Some(path))
}
