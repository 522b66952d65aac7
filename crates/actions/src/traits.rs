//! Action plugin trait definition and shared error types.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tlsreact_query::QueryContext;

/// Errors that can occur while constructing or running an action plugin.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Template rendering failed: {0}")]
    Template(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown plugin kind: {0}")]
    UnknownKind(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Webhook returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Outcome of one trigger matching against an evaluation document.
///
/// Only built when the trigger produced at least one match. Serialized as
/// the template context for per-record templates.
#[derive(Debug, Clone, Serialize)]
pub struct FiredRecord {
    /// Trigger name within its configuration.
    pub tag: String,
    pub title: String,
    /// Plugin names the trigger routes to.
    pub reactors: Vec<String>,
    /// The trigger expression.
    pub objectpath: String,
    /// Classified matches, never empty.
    pub results: Vec<Value>,
    pub config_filename: String,
    pub result_abs_file_path: String,
    pub result_filename: String,
    /// Shared by every record fired from the same document.
    pub evaluation_doc: Arc<Value>,
}

/// Trait for action plugin implementations.
#[async_trait::async_trait]
pub trait ActionPlugin: Send + Sync {
    /// Act on every record routed to this plugin for one result file.
    ///
    /// `ctx` is the query context of the evaluation document the records
    /// were fired from.
    async fn handle(&self, fired: &[FiredRecord], ctx: Arc<QueryContext>) -> Result<(), PluginError>;

    /// Kind identifier this plugin was registered under (e.g. `"webhook"`).
    fn kind(&self) -> &str;
}
