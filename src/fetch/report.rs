use crate::error::Result;
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;
use url::Url;

/// File name a report URL is saved under: its last path segment.
pub fn report_file_name(url: &Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.last())
        .filter(|name| !name.is_empty())
        .unwrap_or("report.xls")
        .to_string()
}

/// Download the given report URL and save it under `dest_dir` using the original filename.
/// Returns the full path of the saved file.
#[tracing::instrument(level = "info", skip(client, dest_dir))]
pub async fn download_report(
    client: &Client,
    url_str: &str,
    dest_dir: impl AsRef<Path>,
) -> Result<PathBuf> {
    let url = Url::parse(url_str)?;
    let dest_path = dest_dir.as_ref().join(report_file_name(&url));

    if let Some(parent) = dest_path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let resp = client.get(url.as_str()).send().await?.error_for_status()?;
    if let Some(ct) = resp.headers().get(reqwest::header::CONTENT_TYPE) {
        info!(content_type = ?ct, "response received");
    }
    let bytes = resp.bytes().await?;
    fs::write(&dest_path, &bytes).await?;
    info!(path = %dest_path.display(), bytes = bytes.len(), "report saved");

    Ok(dest_path)
}
