pub mod config;
pub mod db;
pub mod error;
pub mod fetch;
pub mod history;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod query;

pub use error::{Error, Result};
