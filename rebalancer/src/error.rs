//! Error types for the rebalancer.

use std::path::PathBuf;

/// All errors that can occur during rebalancer operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to open {path}: {source}")]
    TableRead { path: PathBuf, source: csv::Error },

    #[error("{path}, row {row}: {message}")]
    TableRow {
        path: PathBuf,
        row: usize,
        message: String,
    },

    #[error("invalid argument: {0}")]
    Argument(String),

    #[error(transparent)]
    Pipeline(#[from] shadowfolio::StageError),

    #[error("plan sells {shares} shares of {ticker} but only {held} are held")]
    Oversell {
        ticker: String,
        shares: i64,
        held: i64,
    },

    #[error("order limit exceeded: {0}")]
    OrderLimit(String),

    #[error("failed to write orders to {path}: {source}")]
    OrdersWrite { path: PathBuf, source: csv::Error },

    #[error("execution aborted: {0}")]
    Aborted(String),

    #[error("audit log error: {0}")]
    Audit(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
