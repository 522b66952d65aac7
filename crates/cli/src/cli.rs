use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tlsreact_core::Settings;

/// Watch testssl.sh result files and react to findings.
///
/// Every flag overrides the matching `TLSREACT_*` environment variable
/// (also read from `.env`).
#[derive(Parser, Debug)]
#[command(name = "tlsreact", version, about)]
pub struct Cli {
    /// Settings profile; keys are looked up as `{PROFILE}_{KEY}` first.
    #[arg(long, env = "TLSREACT_PROFILE")]
    pub profile: Option<String>,

    /// Directory recursively watched for scan result files [default: ./input]
    #[arg(long)]
    pub input_dir: Option<PathBuf>,

    /// Case-insensitive regex a result path must match [default: .*testssloutput.+.json]
    #[arg(long)]
    pub input_filename_filter: Option<String>,

    /// Directory recursively watched for rule configuration YAML files [default: ./configs]
    #[arg(long)]
    pub config_dir: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Log level when RUST_LOG is unset [default: debug]
    #[arg(long)]
    pub log_level: Option<String>,

    /// Number of result processing workers [default: 10]
    #[arg(long = "input-dir-watchdog-threads")]
    pub watchdog_threads: Option<usize>,

    /// Seconds a result file must settle before it is read [default: 300]
    #[arg(long = "input-dir-sleep-seconds")]
    pub sleep_seconds: Option<u64>,

    /// Surface query errors instead of treating them as no match
    #[arg(long)]
    pub debug_object_path_expr: bool,

    /// Log the evaluation document when a configuration fails
    #[arg(long)]
    pub dump_evaldoc_on_error: bool,

    /// Log every evaluation document at debug level
    #[arg(long)]
    pub dump_evaldoc: bool,

    /// Upper bound on one action plugin invocation [default: 60]
    #[arg(long)]
    pub plugin_timeout_seconds: Option<u64>,

    /// Top-level key of the findings collection [default: scanResult]
    #[arg(long)]
    pub findings_key: Option<String>,
}

impl Cli {
    /// Environment settings with the flags given on the command line applied.
    pub fn into_settings(self) -> Settings {
        let mut settings = match &self.profile {
            Some(profile) => Settings::for_profile(profile),
            None => Settings::from_env(),
        };

        if let Some(dir) = self.input_dir {
            settings.input_dir = dir;
        }
        if let Some(filter) = self.input_filename_filter {
            settings.input_filename_filter = filter;
        }
        if let Some(dir) = self.config_dir {
            settings.config_dir = dir;
        }
        if let Some(file) = self.log_file {
            settings.log_file = Some(file);
        }
        if let Some(level) = self.log_level {
            settings.log_level = level;
        }
        if let Some(threads) = self.watchdog_threads {
            settings.watchdog_threads = threads;
        }
        if let Some(secs) = self.sleep_seconds {
            settings.settle_delay = Duration::from_secs(secs);
        }
        if let Some(secs) = self.plugin_timeout_seconds {
            settings.plugin_timeout = Duration::from_secs(secs);
        }
        if let Some(key) = self.findings_key {
            settings.findings_key = key;
        }
        settings.debug_objectpath_expr |= self.debug_object_path_expr;
        settings.dump_evaldoc_on_error |= self.dump_evaldoc_on_error;
        settings.dump_evaldoc |= self.dump_evaldoc;

        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_settings() {
        let cli = Cli::try_parse_from([
            "tlsreact",
            "--input-dir",
            "/scans",
            "--input-dir-watchdog-threads",
            "4",
            "--input-dir-sleep-seconds",
            "5",
            "--plugin-timeout-seconds",
            "9",
            "--debug-object-path-expr",
            "--dump-evaldoc",
        ])
        .unwrap();
        let settings = cli.into_settings();
        assert_eq!(settings.input_dir, PathBuf::from("/scans"));
        assert_eq!(settings.watchdog_threads, 4);
        assert_eq!(settings.settle_delay, Duration::from_secs(5));
        assert_eq!(settings.plugin_timeout, Duration::from_secs(9));
        assert!(settings.debug_objectpath_expr);
        assert!(settings.dump_evaldoc);
        assert!(!settings.dump_evaldoc_on_error);
    }

    #[test]
    fn rejects_non_numeric_thread_count() {
        assert!(Cli::try_parse_from(["tlsreact", "--input-dir-watchdog-threads", "many"]).is_err());
    }
}
