//! Evaluation document construction.
//!
//! Each (result file, configuration) pair gets its own document: the raw
//! scan payload plus path-derived fields, stored under the configuration's
//! target-key aliases. Later enrichment steps insert into the same map.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tlsreact_rules::TargetKeys;

/// Path-derived facts about one result file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultPaths {
    pub abs_path: PathBuf,
    pub filename: String,
    pub parent_dir_abs: PathBuf,
    /// Parent directory relative to the input directory. Empty when the file
    /// sits directly in the input directory; the absolute parent when the
    /// file lies outside it.
    pub parent_dir_rel: PathBuf,
}

impl ResultPaths {
    pub fn resolve(input_dir: &Path, file: &Path) -> Self {
        let abs_path = std::path::absolute(file).unwrap_or_else(|_| file.to_path_buf());
        let input_abs = std::path::absolute(input_dir).unwrap_or_else(|_| input_dir.to_path_buf());

        let filename = abs_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let parent_dir_abs = abs_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let parent_dir_rel = parent_dir_abs
            .strip_prefix(&input_abs)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| parent_dir_abs.clone());

        Self {
            abs_path,
            filename,
            parent_dir_abs,
            parent_dir_rel,
        }
    }
}

/// Build the base document for one configuration.
///
/// Fields are inserted in a fixed order, so with colliding aliases the
/// later field wins.
pub fn build_document(raw: &Value, paths: &ResultPaths, keys: &TargetKeys) -> Map<String, Value> {
    let mut doc = Map::new();
    doc.insert(keys.result_json.clone(), raw.clone());
    doc.insert(
        keys.result_parent_dir_path.clone(),
        Value::String(paths.parent_dir_rel.to_string_lossy().into_owned()),
    );
    doc.insert(
        keys.result_parent_dir_abs_path.clone(),
        Value::String(paths.parent_dir_abs.to_string_lossy().into_owned()),
    );
    doc.insert(
        keys.result_file_path.clone(),
        Value::String(paths.abs_path.to_string_lossy().into_owned()),
    );
    doc.insert(
        keys.result_filename.clone(),
        Value::String(paths.filename.clone()),
    );
    doc
}

/// Whether `raw` has a non-empty findings collection under `findings_key`.
pub fn has_findings(raw: &Value, findings_key: &str) -> bool {
    match raw.get(findings_key) {
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
        Some(Value::Null) | None => false,
        Some(_) => true,
    }
}
