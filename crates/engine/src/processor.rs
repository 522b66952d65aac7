//! Result processor: evaluates one scan result file against every loaded
//! rule configuration and dispatches fired records to action plugins.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tlsreact_actions::{FiredRecord, PluginRegistry};
use tlsreact_core::Settings;
use tlsreact_query::QueryContext;
use tlsreact_rules::grok::Grok;
use tlsreact_rules::{ConfigRegistry, RuleConfiguration};
use tracing::{debug, error, info, instrument, warn};

use crate::document::{build_document, has_findings, ResultPaths};
use crate::error::{ProcessError, Result};
use crate::expiry::{days_until, parse_expiry};

/// Source of the current time used for expiry arithmetic.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Processing knobs derived from [`Settings`].
#[derive(Debug, Clone)]
pub struct ProcessorOptions {
    /// Root the relative parent directory is computed against.
    pub input_dir: PathBuf,
    /// Top-level key of the findings collection.
    pub findings_key: String,
    /// Propagate query failures instead of treating them as no result.
    pub debug_queries: bool,
    pub dump_doc_on_error: bool,
    pub always_dump_doc: bool,
    pub plugin_timeout: Duration,
}

impl ProcessorOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            input_dir: settings.input_dir.clone(),
            findings_key: settings.findings_key.clone(),
            debug_queries: settings.debug_objectpath_expr,
            dump_doc_on_error: settings.dump_evaldoc_on_error,
            always_dump_doc: settings.dump_evaldoc,
            plugin_timeout: settings.plugin_timeout,
        }
    }
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// What happened to one plugin invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationOutcome {
    Completed,
    Failed(String),
    TimedOut,
    /// A trigger routed to a name with no binding in its configuration.
    UnknownPlugin,
    /// The binding's kind is not registered or its settings were rejected.
    NotConstructed(String),
}

impl InvocationOutcome {
    /// Whether the plugin's `handle` was actually called.
    pub fn was_invoked(&self) -> bool {
        matches!(
            self,
            InvocationOutcome::Completed | InvocationOutcome::Failed(_) | InvocationOutcome::TimedOut
        )
    }
}

#[derive(Debug, Clone)]
pub struct Invocation {
    pub plugin: String,
    /// Trigger tags of the records handed over, in trigger order.
    pub triggers: Vec<String>,
    pub outcome: InvocationOutcome,
}

/// Outcome of one configuration against one result file.
#[derive(Debug, Clone, Default)]
pub struct ConfigReport {
    pub config: String,
    /// Trigger tags that fired, in trigger order.
    pub fired: Vec<String>,
    pub invocations: Vec<Invocation>,
    /// Set when evaluation of this configuration aborted.
    pub error: Option<String>,
}

/// Outcome of one result file.
#[derive(Debug, Clone, Default)]
pub struct ProcessReport {
    pub path: PathBuf,
    /// The findings collection was absent or empty; no configuration ran.
    pub skipped_no_findings: bool,
    pub configurations: Vec<ConfigReport>,
}

impl ProcessReport {
    /// Number of plugin `handle` calls across all configurations.
    pub fn invocation_count(&self) -> usize {
        self.configurations
            .iter()
            .flat_map(|c| &c.invocations)
            .filter(|i| i.outcome.was_invoked())
            .count()
    }
}

/// Evaluates result files against the configurations in a [`ConfigRegistry`].
#[derive(Clone)]
pub struct ResultProcessor {
    registry: ConfigRegistry,
    plugins: PluginRegistry,
    options: ProcessorOptions,
    clock: Clock,
}

impl fmt::Debug for ResultProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultProcessor")
            .field("registry", &self.registry)
            .field("plugins", &self.plugins)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl ResultProcessor {
    pub fn new(registry: ConfigRegistry, plugins: PluginRegistry, options: ProcessorOptions) -> Self {
        Self {
            registry,
            plugins,
            options,
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the clock used for expiry arithmetic.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn options(&self) -> &ProcessorOptions {
        &self.options
    }

    /// Process `path`, logging a file-level failure once.
    pub async fn process(&self, path: &Path) -> Option<ProcessReport> {
        match self.process_file(path).await {
            Ok(report) => Some(report),
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to process result file");
                None
            }
        }
    }

    /// Process `path` against a snapshot of the registry.
    ///
    /// Only reading and parsing the file can fail the whole call; every
    /// configuration's failure is contained in its [`ConfigReport`].
    #[instrument(skip_all, fields(path = %path.display()))]
    pub async fn process_file(&self, path: &Path) -> Result<ProcessReport> {
        let bytes = tokio::fs::read(path).await.map_err(|source| ProcessError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: Value = serde_json::from_slice(&bytes).map_err(|source| ProcessError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let mut report = ProcessReport {
            path: path.to_path_buf(),
            ..Default::default()
        };

        if !has_findings(&raw, &self.options.findings_key) {
            info!(
                findings_key = %self.options.findings_key,
                "result file has no findings, skipping"
            );
            report.skipped_no_findings = true;
            return Ok(report);
        }

        let paths = ResultPaths::resolve(&self.options.input_dir, path);
        let configs = self.registry.snapshot();
        info!(configs = configs.len(), "processing result file");

        for config in configs {
            report
                .configurations
                .push(self.evaluate_config(&config, &raw, &paths).await);
        }
        Ok(report)
    }

    async fn evaluate_config(
        &self,
        config: &RuleConfiguration,
        raw: &Value,
        paths: &ResultPaths,
    ) -> ConfigReport {
        let mut report = ConfigReport {
            config: config.name.clone(),
            ..Default::default()
        };

        let mut doc = build_document(raw, paths, config.target_keys());
        let ctx = match self.prepare(config, paths, &mut doc) {
            Ok(ctx) => ctx,
            Err(e) => {
                self.report_failure(config, &e, &Value::Object(doc));
                report.error = Some(e.to_string());
                return report;
            }
        };

        if self.options.always_dump_doc {
            debug!(config = %config.name, document = %ctx.document(), "evaluation document");
        }

        let fired = match self.fire_triggers(config, &ctx, paths) {
            Ok(fired) => fired,
            Err(e) => {
                self.report_failure(config, &e, ctx.document());
                report.error = Some(e.to_string());
                return report;
            }
        };
        report.fired = fired.iter().map(|r| r.tag.clone()).collect();

        if fired.is_empty() {
            debug!(config = %config.name, "no triggers fired");
            return report;
        }

        report.invocations = self.dispatch(config, Arc::new(ctx), &fired).await;
        report
    }

    /// Enrich the document with path metadata and expiry, returning the
    /// query context over the finished document.
    fn prepare(
        &self,
        config: &RuleConfiguration,
        paths: &ResultPaths,
        doc: &mut Map<String, Value>,
    ) -> Result<QueryContext> {
        let keys = config.target_keys();

        if let Some(pattern) = &config.path_properties_grok {
            let grok = Grok::compile(pattern, &config.custom_groks)?;
            let path_text = paths.abs_path.to_string_lossy();
            let metadata = grok.metadata(&path_text).unwrap_or_else(|| {
                warn!(
                    config = %config.name,
                    path = %path_text,
                    "path_properties_grok did not match result path"
                );
                HashMap::new()
            });
            let metadata: Map<String, Value> = metadata
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect();
            doc.insert(keys.result_metadata.clone(), Value::Object(metadata));
        }

        let mut ctx = QueryContext::new(Value::Object(doc.clone()), self.options.debug_queries);

        let expires = ctx
            .first_match(&config.cert_expires_objectpath)?
            .into_value();
        let days = days_until(parse_expiry(&expires)?, (self.clock)());
        debug!(config = %config.name, cert_expires_in_days = days, "computed certificate expiry");
        doc.insert(keys.cert_expires_in_days.clone(), Value::from(days));

        ctx.update(Value::Object(doc.clone()));
        Ok(ctx)
    }

    fn fire_triggers(
        &self,
        config: &RuleConfiguration,
        ctx: &QueryContext,
        paths: &ResultPaths,
    ) -> Result<Vec<FiredRecord>> {
        let mut fired = Vec::new();
        for (tag, trigger) in &config.trigger_on {
            let results = ctx.any_match(&trigger.objectpath)?.into_matches();
            if results.is_empty() {
                debug!(config = %config.name, trigger = %tag, "trigger did not match");
                continue;
            }
            info!(
                config = %config.name,
                trigger = %tag,
                matches = results.len(),
                "trigger fired"
            );
            fired.push(FiredRecord {
                tag: tag.clone(),
                title: trigger.title.clone(),
                reactors: trigger.reactors.clone(),
                objectpath: trigger.objectpath.clone(),
                results,
                config_filename: config.name.clone(),
                result_abs_file_path: paths.abs_path.to_string_lossy().into_owned(),
                result_filename: paths.filename.clone(),
                evaluation_doc: ctx.shared_document(),
            });
        }
        Ok(fired)
    }

    /// Invoke each referenced plugin once with the union of its records.
    async fn dispatch(
        &self,
        config: &RuleConfiguration,
        ctx: Arc<QueryContext>,
        fired: &[FiredRecord],
    ) -> Vec<Invocation> {
        let mut invocations = Vec::new();

        for (plugin_name, records) in group_by_plugin(fired) {
            let triggers: Vec<String> = records.iter().map(|r| r.tag.clone()).collect();

            let Some(binding) = config.binding(&plugin_name) else {
                error!(
                    config = %config.name,
                    plugin = %plugin_name,
                    "trigger references unknown plugin, skipping"
                );
                invocations.push(Invocation {
                    plugin: plugin_name,
                    triggers,
                    outcome: InvocationOutcome::UnknownPlugin,
                });
                continue;
            };

            let plugin = match self.plugins.create(binding) {
                Ok(plugin) => plugin,
                Err(e) => {
                    error!(
                        config = %config.name,
                        plugin = %plugin_name,
                        class_name = %binding.class_name,
                        error = %e,
                        "failed to construct plugin, skipping"
                    );
                    invocations.push(Invocation {
                        plugin: plugin_name,
                        triggers,
                        outcome: InvocationOutcome::NotConstructed(e.to_string()),
                    });
                    continue;
                }
            };

            let kind = plugin.kind().to_string();
            let record_count = records.len();
            let start = Instant::now();
            // A panic inside the plugin surfaces as a join error.
            let plugin_ctx = Arc::clone(&ctx);
            let mut task =
                tokio::spawn(async move { plugin.handle(&records, plugin_ctx).await });
            let outcome = match tokio::time::timeout(self.options.plugin_timeout, &mut task).await
            {
                Ok(Ok(Ok(()))) => {
                    info!(
                        config = %config.name,
                        plugin = %plugin_name,
                        kind = %kind,
                        records = record_count,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "plugin completed"
                    );
                    InvocationOutcome::Completed
                }
                Ok(Ok(Err(e))) => {
                    error!(
                        config = %config.name,
                        plugin = %plugin_name,
                        kind = %kind,
                        error = %e,
                        "plugin failed"
                    );
                    InvocationOutcome::Failed(e.to_string())
                }
                Ok(Err(e)) => {
                    error!(
                        config = %config.name,
                        plugin = %plugin_name,
                        kind = %kind,
                        panicked = e.is_panic(),
                        error = %e,
                        "plugin task aborted"
                    );
                    InvocationOutcome::Failed(e.to_string())
                }
                Err(_) => {
                    task.abort();
                    error!(
                        config = %config.name,
                        plugin = %plugin_name,
                        kind = %kind,
                        timeout = ?self.options.plugin_timeout,
                        "plugin timed out"
                    );
                    InvocationOutcome::TimedOut
                }
            };

            invocations.push(Invocation {
                plugin: plugin_name,
                triggers,
                outcome,
            });
        }

        invocations
    }

    fn report_failure(&self, config: &RuleConfiguration, err: &ProcessError, document: &Value) {
        error!(config = %config.name, error = %err, "failed to evaluate configuration");
        if self.options.dump_doc_on_error {
            error!(config = %config.name, document = %document, "evaluation document at failure");
        }
    }
}

/// Group records by every plugin they reference. Plugins appear in order of
/// first reference and each receives its records in trigger order.
fn group_by_plugin(fired: &[FiredRecord]) -> Vec<(String, Vec<FiredRecord>)> {
    let mut groups: Vec<(String, Vec<FiredRecord>)> = Vec::new();
    for record in fired {
        for name in &record.reactors {
            let index = match groups.iter().position(|(n, _)| n == name) {
                Some(index) => index,
                None => {
                    groups.push((name.clone(), Vec::new()));
                    groups.len() - 1
                }
            };
            let records = &mut groups[index].1;
            if !records.iter().any(|r| r.tag == record.tag) {
                records.push(record.clone());
            }
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(tag: &str, reactors: &[&str]) -> FiredRecord {
        FiredRecord {
            tag: tag.to_string(),
            title: tag.to_uppercase(),
            reactors: reactors.iter().map(|s| s.to_string()).collect(),
            objectpath: "$.x".to_string(),
            results: vec![json!(true)],
            config_filename: "c.yaml".to_string(),
            result_abs_file_path: "/in/x.json".to_string(),
            result_filename: "x.json".to_string(),
            evaluation_doc: Arc::new(json!({})),
        }
    }

    fn tags(records: &[FiredRecord]) -> Vec<&str> {
        records.iter().map(|r| r.tag.as_str()).collect()
    }

    #[test]
    fn grouping_is_union_in_trigger_order() {
        let fired = vec![
            record("t1", &["a", "b"]),
            record("t2", &["b"]),
            record("t3", &["c", "a"]),
        ];
        let groups = group_by_plugin(&fired);
        let names: Vec<&str> = groups.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(tags(&groups[0].1), vec!["t1", "t3"]);
        assert_eq!(tags(&groups[1].1), vec!["t1", "t2"]);
        assert_eq!(tags(&groups[2].1), vec!["t3"]);
    }

    #[test]
    fn repeated_plugin_in_one_trigger_counts_once() {
        let groups = group_by_plugin(&[record("t1", &["a", "a"])]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].1.len(), 1);
    }

    #[test]
    fn records_without_plugins_form_no_group() {
        assert!(group_by_plugin(&[record("t1", &[])]).is_empty());
    }

    #[test]
    fn options_follow_settings() {
        let mut settings = Settings::default();
        settings.dump_evaldoc = true;
        settings.findings_key = "findings".to_string();
        let options = ProcessorOptions::from_settings(&settings);
        assert!(options.always_dump_doc);
        assert!(!options.dump_doc_on_error);
        assert_eq!(options.findings_key, "findings");
        assert_eq!(options.plugin_timeout, Duration::from_secs(60));
    }
}
