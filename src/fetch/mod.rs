// src/fetch/mod.rs
pub mod report;
pub mod urls;

pub use report::download_report;
pub use urls::fetch_report_urls;
