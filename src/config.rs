//! Runtime configuration read from the environment (and `.env`).

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_RESULTS_PAGE: &str =
    "https://spimex.com/markets/oil_products/trades/results/";
pub const DEFAULT_TABLE_NAME: &str = "trade_data";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Page listing the published trade-result reports.
    pub results_page: String,
    /// Fixed report URL; when set, link discovery is skipped.
    pub report_url: Option<String>,
    pub download_dir: PathBuf,
    pub output_dir: PathBuf,
    pub history_dir: PathBuf,
    pub table_name: String,
    pub database: Option<DatabaseConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
}

impl DatabaseConfig {
    pub fn url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.name
        )
    }
}

impl Config {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database = match get("DB_HOST") {
            None => None,
            Some(host) => {
                let require = |key: &str| {
                    get(key).ok_or_else(|| {
                        Error::config(format!("{key} is required when DB_HOST is set"))
                    })
                };
                let port = match get("DB_PORT") {
                    Some(p) => p
                        .parse()
                        .map_err(|_| Error::config(format!("DB_PORT {p:?} is not a port")))?,
                    None => 5432,
                };
                Some(DatabaseConfig {
                    host,
                    port,
                    name: require("DB_NAME")?,
                    user: require("DB_USER")?,
                    password: require("DB_PASSWORD")?,
                })
            }
        };

        Ok(Config {
            results_page: get("SPIMEX_RESULTS_PAGE")
                .unwrap_or_else(|| DEFAULT_RESULTS_PAGE.to_string()),
            report_url: get("SPIMEX_REPORT_URL"),
            download_dir: get("DOWNLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("reports")),
            output_dir: get("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("output")),
            history_dir: get("HISTORY_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("history")),
            table_name: get("TABLE_NAME").unwrap_or_else(|| DEFAULT_TABLE_NAME.to_string()),
            database,
        })
    }
}
