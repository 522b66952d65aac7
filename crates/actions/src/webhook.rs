//! Chat-style HTTP webhook plugin.
//!
//! Renders a JSON body template once against the evaluation document,
//! appends one attachment per fired record and delivers the result in a
//! single request.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use tlsreact_query::QueryContext;

use crate::templating::TemplateRenderer;
use crate::traits::{ActionPlugin, FiredRecord, PluginError};

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Settings accepted by a webhook binding.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookSettings {
    /// Target URL; `${VAR}` references are resolved from the environment.
    #[serde(alias = "url")]
    pub webhook_url: String,
    /// Minijinja template that must render a JSON object.
    pub template: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

/// Delivers fired records as attachments of one JSON webhook request.
#[derive(Debug)]
pub struct WebhookReactor {
    /// Target URL (env vars already resolved).
    url: String,
    method: reqwest::Method,
    /// Custom headers (env vars already resolved).
    headers: HashMap<String, String>,
    template: String,
    client: reqwest::Client,
}

impl WebhookReactor {
    /// Build from binding settings.
    ///
    /// Environment variable references in the URL and header values are
    /// resolved eagerly and the template is syntax-checked, so a broken
    /// binding fails before any request is attempted.
    pub fn from_settings(settings: &Value) -> Result<Self, PluginError> {
        let settings: WebhookSettings = serde_json::from_value(settings.clone())
            .map_err(|e| PluginError::Config(format!("invalid webhook settings: {e}")))?;

        let method = match settings.method {
            Some(m) => m
                .to_uppercase()
                .parse::<reqwest::Method>()
                .map_err(|_| PluginError::Config(format!("invalid HTTP method: {m}")))?,
            None => reqwest::Method::POST,
        };

        let mut headers = HashMap::with_capacity(settings.headers.len());
        for (key, value) in &settings.headers {
            headers.insert(key.clone(), resolve_env_vars(value)?);
        }

        TemplateRenderer::validate(&settings.template)
            .map_err(|e| PluginError::Config(format!("invalid body template: {e}")))?;

        let timeout = Duration::from_secs(
            settings
                .timeout_seconds
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        );
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            url: resolve_env_vars(&settings.webhook_url)?,
            method,
            headers,
            template: settings.template,
            client,
        })
    }
}

#[async_trait::async_trait]
impl ActionPlugin for WebhookReactor {
    async fn handle(&self, fired: &[FiredRecord], ctx: Arc<QueryContext>) -> Result<(), PluginError> {
        let renderer = TemplateRenderer::new(Arc::clone(&ctx));
        let rendered = renderer.render(&self.template, ctx.document())?;
        let payload = build_payload(&rendered, fired)?;

        let mut request = self
            .client
            .request(self.method.clone(), &self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload.to_string());

        for (key, value) in &self.headers {
            request = request.header(key.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::warn!(
                url = %self.url,
                %status,
                body = %body,
                "webhook returned non-2xx status"
            );
            return Err(PluginError::Status {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(
            url = %self.url,
            method = %self.method,
            %status,
            attachments = fired.len(),
            "webhook delivered"
        );

        Ok(())
    }

    fn kind(&self) -> &str {
        "webhook"
    }
}

/// Parse the rendered template and append one attachment per record.
pub fn build_payload(rendered: &str, fired: &[FiredRecord]) -> Result<Value, PluginError> {
    let mut payload: Value = serde_json::from_str(rendered)
        .map_err(|e| PluginError::Template(format!("template did not render valid JSON: {e}")))?;

    let attachments = payload
        .as_object_mut()
        .ok_or_else(|| PluginError::Template("template must render a JSON object".to_string()))?
        .entry("attachments")
        .or_insert_with(|| Value::Array(Vec::new()))
        .as_array_mut()
        .ok_or_else(|| PluginError::Template("`attachments` must be an array".to_string()))?;

    attachments.extend(fired.iter().map(attachment));
    Ok(payload)
}

fn attachment(record: &FiredRecord) -> Value {
    let mut text = String::from("```\n");
    for result in &record.results {
        text.push_str(&result.to_string());
        text.push('\n');
    }
    text.push_str("```\n");
    json!({
        "title": record.title,
        "text": text,
        "color": "danger",
    })
}

/// Resolve `${VAR_NAME}` patterns in a string using `std::env::var`.
///
/// Returns an error if a referenced variable is not set.
fn resolve_env_vars(input: &str) -> Result<String, PluginError> {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut var_name = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '}' {
                    closed = true;
                    break;
                }
                var_name.push(c);
            }
            if !closed {
                return Err(PluginError::Config(format!(
                    "unclosed env var reference in: {input}"
                )));
            }
            let value = std::env::var(&var_name)
                .map_err(|_| PluginError::Config(format!("env var not found: {var_name}")))?;
            result.push_str(&value);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}
