//! Evaluation document field aliases.

use serde::{Deserialize, Serialize};

/// Document field names for each enrichment value.
///
/// Every key defaults to its own logical name. Aliases are expected to be
/// distinct; when two share a name the later write during document
/// construction wins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetKeys {
    /// Raw scan result payload.
    #[serde(default = "default_result_json", alias = "testssl_result_json")]
    pub result_json: String,
    /// Parent directory of the result file, relative to the input directory.
    #[serde(default = "default_result_parent_dir_path", alias = "testssl_result_parent_dir_path")]
    pub result_parent_dir_path: String,
    #[serde(default = "default_result_parent_dir_abs_path", alias = "testssl_result_parent_dir_abs_path")]
    pub result_parent_dir_abs_path: String,
    #[serde(default = "default_result_file_path", alias = "testssl_result_file_path")]
    pub result_file_path: String,
    #[serde(default = "default_result_filename", alias = "testssl_result_filename")]
    pub result_filename: String,
    /// Fields captured by `path_properties_grok`.
    #[serde(default = "default_result_metadata")]
    pub result_metadata: String,
    #[serde(default = "default_cert_expires_in_days")]
    pub cert_expires_in_days: String,
}

fn default_result_json() -> String {
    "result_json".to_string()
}

fn default_result_parent_dir_path() -> String {
    "result_parent_dir_path".to_string()
}

fn default_result_parent_dir_abs_path() -> String {
    "result_parent_dir_abs_path".to_string()
}

fn default_result_file_path() -> String {
    "result_file_path".to_string()
}

fn default_result_filename() -> String {
    "result_filename".to_string()
}

fn default_result_metadata() -> String {
    "result_metadata".to_string()
}

fn default_cert_expires_in_days() -> String {
    "cert_expires_in_days".to_string()
}

impl Default for TargetKeys {
    fn default() -> Self {
        Self {
            result_json: default_result_json(),
            result_parent_dir_path: default_result_parent_dir_path(),
            result_parent_dir_abs_path: default_result_parent_dir_abs_path(),
            result_file_path: default_result_file_path(),
            result_filename: default_result_filename(),
            result_metadata: default_result_metadata(),
            cert_expires_in_days: default_cert_expires_in_days(),
        }
    }
}
