use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, TlsReactError};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_bool(profile: &str, key: &str) -> bool {
    profiled_env_opt(profile, key)
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

pub const DEFAULT_INPUT_FILENAME_FILTER: &str = ".*testssloutput.+.json";
pub const DEFAULT_FINDINGS_KEY: &str = "scanResult";
pub const DEFAULT_WATCHDOG_THREADS: usize = 10;
pub const DEFAULT_SETTLE_SECONDS: u64 = 300;
pub const DEFAULT_PLUGIN_TIMEOUT_SECONDS: u64 = 60;

// ── Top-level settings ────────────────────────────────────────

/// Process-wide settings for the result handler.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Active profile name (empty = default).
    pub profile: String,
    /// Directory recursively watched for scan result JSON files.
    pub input_dir: PathBuf,
    /// Case-insensitive regex a result path must match to be considered.
    pub input_filename_filter: String,
    /// Directory recursively watched for rule configuration YAML files.
    pub config_dir: PathBuf,
    pub log_file: Option<PathBuf>,
    pub log_level: String,
    /// Worker pool size for result file processing.
    pub watchdog_threads: usize,
    /// How long a result file must settle before it is validated.
    pub settle_delay: Duration,
    /// Propagate query failures instead of treating them as no result.
    pub debug_objectpath_expr: bool,
    pub dump_evaldoc_on_error: bool,
    pub dump_evaldoc: bool,
    /// Upper bound on a single action plugin invocation.
    pub plugin_timeout: Duration,
    /// Top-level key of the findings collection in a result file.
    pub findings_key: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            profile: String::new(),
            input_dir: PathBuf::from("./input"),
            input_filename_filter: DEFAULT_INPUT_FILENAME_FILTER.to_string(),
            config_dir: PathBuf::from("./configs"),
            log_file: None,
            log_level: "debug".to_string(),
            watchdog_threads: DEFAULT_WATCHDOG_THREADS,
            settle_delay: Duration::from_secs(DEFAULT_SETTLE_SECONDS),
            debug_objectpath_expr: false,
            dump_evaldoc_on_error: false,
            dump_evaldoc: false,
            plugin_timeout: Duration::from_secs(DEFAULT_PLUGIN_TIMEOUT_SECONDS),
            findings_key: DEFAULT_FINDINGS_KEY.to_string(),
        }
    }
}

impl Settings {
    /// Build settings from environment variables (call `load_dotenv()` first).
    /// Profile is read from `TLSREACT_PROFILE`. When set (e.g. `PROD`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("TLSREACT_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build settings for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        let defaults = Self::default();
        Self {
            profile: p.to_string(),
            input_dir: PathBuf::from(profiled_env_or(p, "TLSREACT_INPUT_DIR", "./input")),
            input_filename_filter: profiled_env_or(
                p,
                "TLSREACT_INPUT_FILENAME_FILTER",
                DEFAULT_INPUT_FILENAME_FILTER,
            ),
            config_dir: PathBuf::from(profiled_env_or(p, "TLSREACT_CONFIG_DIR", "./configs")),
            log_file: profiled_env_opt(p, "TLSREACT_LOG_FILE").map(PathBuf::from),
            log_level: profiled_env_or(p, "TLSREACT_LOG_LEVEL", &defaults.log_level),
            watchdog_threads: profiled_env_u64(
                p,
                "TLSREACT_WATCHDOG_THREADS",
                DEFAULT_WATCHDOG_THREADS as u64,
            ) as usize,
            settle_delay: Duration::from_secs(profiled_env_u64(
                p,
                "TLSREACT_SLEEP_SECONDS",
                DEFAULT_SETTLE_SECONDS,
            )),
            debug_objectpath_expr: profiled_env_bool(p, "TLSREACT_DEBUG_OBJECTPATH_EXPR"),
            dump_evaldoc_on_error: profiled_env_bool(p, "TLSREACT_DUMP_EVALDOC_ON_ERROR"),
            dump_evaldoc: profiled_env_bool(p, "TLSREACT_DUMP_EVALDOC"),
            plugin_timeout: Duration::from_secs(profiled_env_u64(
                p,
                "TLSREACT_PLUGIN_TIMEOUT_SECONDS",
                DEFAULT_PLUGIN_TIMEOUT_SECONDS,
            )),
            findings_key: profiled_env_or(p, "TLSREACT_FINDINGS_KEY", DEFAULT_FINDINGS_KEY),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Reject settings the watcher and worker pool cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.watchdog_threads == 0 {
            return Err(TlsReactError::InvalidSetting {
                key: "watchdog_threads",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.input_filename_filter.trim().is_empty() {
            return Err(TlsReactError::InvalidSetting {
                key: "input_filename_filter",
                reason: "must not be empty".to_string(),
            });
        }
        if self.findings_key.is_empty() {
            return Err(TlsReactError::InvalidSetting {
                key: "findings_key",
                reason: "must not be empty".to_string(),
            });
        }
        if self.plugin_timeout.is_zero() {
            return Err(TlsReactError::InvalidSetting {
                key: "plugin_timeout",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Settings loaded (profile: {}):", self.profile_label());
        tracing::info!("  input:    dir={}, filter={}", self.input_dir.display(), self.input_filename_filter);
        tracing::info!("  configs:  dir={}", self.config_dir.display());
        tracing::info!(
            "  workers:  threads={}, settle={}s, plugin_timeout={}s",
            self.watchdog_threads,
            self.settle_delay.as_secs(),
            self.plugin_timeout.as_secs()
        );
        tracing::info!(
            "  debug:    objectpath={}, dump_on_error={}, dump_always={}",
            self.debug_objectpath_expr,
            self.dump_evaldoc_on_error,
            self.dump_evaldoc
        );
    }
}
