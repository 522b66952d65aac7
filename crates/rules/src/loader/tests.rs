//! Tests for the config loader module.

use std::fs;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use super::*;
use crate::registry::ConfigRegistry;

const VALID_CONFIG_YAML: &str = r#"
cert_expires_objectpath: "$.result_json.scanResult[*].serverDefaults[@.id is 'cert_notAfter'].finding"
trigger_on:
  weak:
    title: Weak cipher
    objectpath: "$.result_json.scanResult[@.finding is 'weak-cipher']"
    reactors: [hook]
reactor_engines:
  hook:
    class_name: webhook
    url: "http://127.0.0.1:9/hook"
    template: '{"attachments": []}'
"#;

fn temp_loader() -> (TempDir, ConfigLoader) {
    let dir = TempDir::new().expect("create tempdir");
    let loader = ConfigLoader::new(dir.path().to_path_buf(), ConfigRegistry::new());
    (dir, loader)
}

#[test]
fn created_file_is_stored_under_base_filename() {
    let (dir, loader) = temp_loader();
    let path = dir.path().join("prod.yaml");
    fs::write(&path, VALID_CONFIG_YAML).unwrap();

    let result = loader.handle_created(&path);
    assert_eq!(
        result.status,
        LoadStatus::Loaded {
            name: "prod.yaml".to_string()
        }
    );
    let config = loader.registry().get("prod.yaml").unwrap();
    assert_eq!(config.name, "prod.yaml");
    assert_eq!(config.trigger_on.len(), 1);
}

#[test]
fn parse_failure_keeps_previous_entry() {
    let (dir, loader) = temp_loader();
    let path = dir.path().join("prod.yaml");
    fs::write(&path, VALID_CONFIG_YAML).unwrap();
    loader.handle_created(&path);

    fs::write(&path, "trigger_on: [this is: not valid").unwrap();
    let result = loader.handle_created(&path);
    assert!(matches!(result.status, LoadStatus::Failed { .. }));

    let config = loader.registry().get("prod.yaml").unwrap();
    assert_eq!(config.trigger_on["weak"].title, "Weak cipher");
}

#[test]
fn parse_failure_leaves_absent_entry_absent() {
    let (dir, loader) = temp_loader();
    let path = dir.path().join("broken.yaml");
    fs::write(&path, "reactor_engines: 12\n").unwrap();

    assert!(matches!(
        loader.handle_created(&path).status,
        LoadStatus::Failed { .. }
    ));
    assert!(loader.registry().get("broken.yaml").is_none());
    assert!(loader.registry().is_empty());
}

#[test]
fn non_yaml_and_dotfiles_skipped() {
    let (dir, loader) = temp_loader();
    let txt = dir.path().join("readme.txt");
    let hidden = dir.path().join(".prod.yaml.swp");
    fs::write(&txt, "not a config").unwrap();
    fs::write(&hidden, VALID_CONFIG_YAML).unwrap();

    assert!(matches!(loader.handle_created(&txt).status, LoadStatus::Skipped { .. }));
    assert!(matches!(loader.handle_created(&hidden).status, LoadStatus::Skipped { .. }));
    assert!(matches!(
        loader.handle_created(dir.path()).status,
        LoadStatus::Skipped { .. }
    ));
    assert!(loader.registry().is_empty());
}

#[test]
fn load_existing_walks_subdirectories() {
    let (dir, loader) = temp_loader();
    fs::write(dir.path().join("a.yaml"), VALID_CONFIG_YAML).unwrap();
    let sub = dir.path().join("team");
    fs::create_dir(&sub).unwrap();
    fs::write(sub.join("b.yml"), VALID_CONFIG_YAML).unwrap();
    fs::write(sub.join("c.yaml"), "cert_expires_objectpath: [unclosed").unwrap();

    let results = loader.load_existing();
    let loaded = results
        .iter()
        .filter(|r| matches!(r.status, LoadStatus::Loaded { .. }))
        .count();
    let failed = results
        .iter()
        .filter(|r| matches!(r.status, LoadStatus::Failed { .. }))
        .count();

    assert_eq!(loaded, 2);
    assert_eq!(failed, 1);
    assert_eq!(loader.registry().names(), vec!["a.yaml", "b.yml"]);
}

#[test]
fn rule_file_detection() {
    use std::path::Path;
    assert!(is_rule_file(Path::new("/c/prod.yaml")));
    assert!(is_rule_file(Path::new("/c/prod.yml")));
    assert!(is_rule_file(Path::new("/c/prod.yaml.bak")));
    assert!(!is_rule_file(Path::new("/c/prod.json")));
    assert!(!is_rule_file(Path::new("/c/.prod.yaml")));
}

#[test]
fn watcher_picks_up_new_files() {
    let (dir, loader) = temp_loader();
    let watcher = loader.watch().unwrap();

    // Write elsewhere and rename in so the handler never sees a partial file.
    let staging = TempDir::new().unwrap();
    let staged = staging.path().join("live.yaml");
    fs::write(&staged, VALID_CONFIG_YAML).unwrap();
    fs::rename(&staged, dir.path().join("live.yaml")).unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    while loader.registry().get("live.yaml").is_none() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(50));
    }
    watcher.stop();
    assert!(loader.registry().get("live.yaml").is_some());
}

#[test]
fn existing_files_load_on_the_watcher_worker() {
    let (dir, loader) = temp_loader();
    fs::write(dir.path().join("a.yaml"), VALID_CONFIG_YAML).unwrap();
    fs::write(dir.path().join("b.yml"), VALID_CONFIG_YAML).unwrap();
    fs::write(dir.path().join("notes.txt"), "skip me").unwrap();

    let watcher = loader.watch().unwrap();
    assert_eq!(watcher.queue_existing(), 3);
    // Stopping drains the worker queue.
    watcher.stop();

    assert_eq!(loader.registry().names(), vec!["a.yaml", "b.yml"]);
}
