//! Minijinja template rendering for action plugins.
//!
//! Templates are arbitrary strings taken from plugin settings and are
//! rendered either against a [`FiredRecord`](crate::FiredRecord) or against
//! the evaluation document itself. Every environment carries the query
//! filters bound to the live [`QueryContext`], so a template can pull values
//! out of the document it was fired from:
//!
//! ```text
//! {{ "$.result_json.scanResult[0].targetHost" | exec_objectpath_first_match }}
//! ```

use std::sync::Arc;

use minijinja::{Environment, ErrorKind};
use serde::Serialize;
use tlsreact_query::{QueryContext, QueryOutput};

use crate::traits::PluginError;

/// Renders plugin templates with the query filters of one evaluation.
pub struct TemplateRenderer {
    env: Environment<'static>,
}

impl TemplateRenderer {
    /// Build an environment whose query filters evaluate against `query`.
    pub fn new(query: Arc<QueryContext>) -> Self {
        let mut env = Environment::new();

        let ctx = Arc::clone(&query);
        env.add_filter("exec_objectpath", move |expr: String| {
            to_template_value(ctx.any_match(&expr))
        });

        let ctx = Arc::clone(&query);
        env.add_filter("exec_objectpath_first_match", move |expr: String| {
            to_template_value(ctx.first_match(&expr))
        });

        let ctx = query;
        env.add_filter(
            "exec_objectpath_specific_match",
            move |expr: String, index: Option<usize>| {
                to_template_value(ctx.specific_match(&expr, index))
            },
        );

        env.add_filter("json", json_filter);
        env.add_function("env", env_function);

        Self { env }
    }

    /// Render a template string with the given context.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Template`] if the template is invalid or a
    /// filter fails during rendering.
    pub fn render<S: Serialize>(&self, template_str: &str, ctx: &S) -> Result<String, PluginError> {
        self.env
            .render_str(template_str, ctx)
            .map_err(|e| PluginError::Template(e.to_string()))
    }

    /// Check that a template string parses, without evaluating it.
    pub fn validate(template_str: &str) -> Result<(), PluginError> {
        Environment::new()
            .template_from_str(template_str)
            .map_err(|e| PluginError::Template(e.to_string()))?;
        Ok(())
    }
}

fn to_template_value(
    output: tlsreact_query::Result<QueryOutput>,
) -> Result<minijinja::Value, minijinja::Error> {
    output
        .map(|out| minijinja::Value::from_serialize(out.into_value()))
        .map_err(|e| minijinja::Error::new(ErrorKind::InvalidOperation, e.to_string()))
}

/// Custom filter: serialize a value as a JSON literal.
fn json_filter(value: minijinja::Value) -> Result<String, minijinja::Error> {
    serde_json::to_string(&value)
        .map_err(|e| minijinja::Error::new(ErrorKind::InvalidOperation, e.to_string()))
}

/// Global function: read an environment variable by name.
///
/// Returns an empty string (with a warning) if the variable is not set.
fn env_function(name: String) -> String {
    match std::env::var(&name) {
        Ok(val) => val,
        Err(_) => {
            tracing::warn!(var = %name, "Environment variable not found, returning empty string");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn renderer(debug: bool) -> TemplateRenderer {
        let doc = json!({
            "result_filename": "scan.json",
            "result_json": {
                "scanResult": [
                    {"targetHost": "a.example", "port": "443"},
                    {"targetHost": "b.example", "port": "8443"}
                ]
            }
        });
        TemplateRenderer::new(Arc::new(QueryContext::new(doc, debug)))
    }

    #[test]
    fn renders_plain_context() {
        let out = renderer(false)
            .render("/out/{{ tag }}/{{ name }}", &json!({"tag": "weak", "name": "x.json"}))
            .unwrap();
        assert_eq!(out, "/out/weak/x.json");
    }

    #[test]
    fn first_match_filter_reads_document() {
        let out = renderer(false)
            .render(
                r#"{{ "$.result_json.scanResult[*].targetHost" | exec_objectpath_first_match }}"#,
                &json!({}),
            )
            .unwrap();
        assert_eq!(out, "a.example");
    }

    #[test]
    fn specific_match_filter_selects_index() {
        let out = renderer(false)
            .render(
                r#"{{ "$.result_json.scanResult[*].port" | exec_objectpath_specific_match(1) }}"#,
                &json!({}),
            )
            .unwrap();
        assert_eq!(out, "8443");
    }

    #[test]
    fn any_match_filter_returns_all_matches() {
        let out = renderer(false)
            .render(
                r#"{% for h in "$.result_json.scanResult[*].targetHost" | exec_objectpath %}{{ h }};{% endfor %}"#,
                &json!({}),
            )
            .unwrap();
        assert_eq!(out, "a.example;b.example;");
    }

    #[test]
    fn out_of_range_index_fails_render() {
        let err = renderer(false)
            .render(
                r#"{{ "$.result_json.scanResult[*].port" | exec_objectpath_specific_match(5) }}"#,
                &json!({}),
            )
            .unwrap_err();
        assert!(matches!(err, PluginError::Template(_)));
    }

    #[test]
    fn json_filter_escapes_strings() {
        let out = renderer(false)
            .render("{{ v | json }}", &json!({"v": "say \"hi\""}))
            .unwrap();
        assert_eq!(out, r#""say \"hi\"""#);
    }

    #[test]
    fn validate_rejects_unclosed_tag() {
        assert!(TemplateRenderer::validate("{{ unclosed").is_err());
        assert!(TemplateRenderer::validate("{{ closed }}").is_ok());
    }
}
