use std::path::PathBuf;

use tlsreact_query::QueryError;
use tlsreact_rules::grok::GrokError;

/// Errors raised while processing one result file.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("query failed: {0}")]
    Query(#[from] QueryError),

    #[error("grok pattern error: {0}")]
    Grok(#[from] GrokError),

    #[error("certificate expiry: {0}")]
    Expiry(String),

    #[error("invalid input filename filter: {0}")]
    Filter(#[from] regex::Error),

    #[error("failed to watch input directory: {0}")]
    Watch(#[from] notify::Error),
}

pub type Result<T> = std::result::Result<T, ProcessError>;
