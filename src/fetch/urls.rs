// src/fetch/urls.rs
use crate::error::Result;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use std::cmp::Reverse;
use tracing::{debug, info};
use url::Url;

/// Trade-result spreadsheets all live under `.../oil_xls/`.
const REPORT_LINK_SELECTOR: &str = r#"a[href*="oil_xls"]"#;

fn timestamp_regex() -> Regex {
    Regex::new(r"oil_xls_(\d{14})").expect("report timestamp regex is valid")
}

fn timestamp_with(re: &Regex, url: &Url) -> Option<String> {
    let name = url.path_segments()?.last()?;
    re.captures(name).map(|c| c[1].to_string())
}

/// `oil_xls_YYYYMMDDhhmmss.xls` → `YYYYMMDDhhmmss`
pub fn report_timestamp(url: &Url) -> Option<String> {
    timestamp_with(&timestamp_regex(), url)
}

/// Pull report links out of a results page, newest first. Links without a
/// timestamp in their file name sort last, in page order.
pub fn report_links(html: &str, base: &Url) -> Vec<Url> {
    let selector =
        Selector::parse(REPORT_LINK_SELECTOR).expect("CSS selector for report links is valid");

    let mut links: Vec<Url> = Vec::new();
    for href in Html::parse_document(html)
        .select(&selector)
        .filter_map(|e| e.value().attr("href"))
    {
        let Ok(mut url) = base.join(href.trim()) else {
            debug!(href, "skipping unparseable link");
            continue;
        };
        url.set_fragment(None);
        if !links.contains(&url) {
            links.push(url);
        }
    }

    // stable sort keeps page order among equal keys; undated (None) sorts last
    let re = timestamp_regex();
    links.sort_by_cached_key(|u| Reverse(timestamp_with(&re, u)));
    links
}

/// Fetch the results page and list its report links, newest first.
#[tracing::instrument(level = "info", skip(client))]
pub async fn fetch_report_urls(client: &Client, page: &str) -> Result<Vec<Url>> {
    let base = Url::parse(page)?;
    let html = client
        .get(base.as_str())
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    let links = report_links(&html, &base);
    info!(found = links.len(), "report links discovered");
    Ok(links)
}
