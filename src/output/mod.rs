// src/output/mod.rs
pub mod columnar;
pub mod delimited;

/// Raw extraction dump, positional headers.
pub const EXTRACTED_CSV: &str = "simple_extracted.csv";
/// Typed records with the persisted column names.
pub const PARSED_CSV: &str = "Parsed_data.csv";
pub const PARSED_PARQUET: &str = "Parsed_data.parquet";
