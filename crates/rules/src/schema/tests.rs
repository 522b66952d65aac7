//! Tests for schema types.

use super::*;

const FULL_CONFIG_YAML: &str = r#"
evaluation_doc_config:
  target_keys:
    testssl_result_json: testssl_result
    result_metadata: meta
path_properties_grok: "%{DATA:ignored}/testssloutput/%{HOSTNAME:host}/%{DATA:ignored2}"
custom_groks:
  SCANID: "[0-9a-f]{8}"
cert_expires_objectpath: "$.testssl_result.scanResult[*].serverDefaults[@.id is 'cert_notAfter'].finding"
trigger_on:
  weak_ciphers:
    title: Weak ciphers offered
    objectpath: "$.testssl_result.scanResult[*].cipherTests[@.severity is 'HIGH']"
    reactors: [slack, archive]
  expiring:
    title: Certificate expires soon
    objectpath: "$.cert_expires_in_days < 30"
    reactors: [slack]
reactor_engines:
  slack:
    class_name: SlackReactor
    webhook_url: "https://hooks.example.com/T000/B000"
    template: '{"text": "scan of {{ meta.host }}", "attachments": []}'
  archive:
    class_name: CopyFileReactor
    copy_from: "{{ result_abs_file_path }}"
    copy_to: "/archive/{{ tag }}/{{ result_filename }}"
"#;

#[test]
fn parse_full_configuration() {
    let config = RuleConfiguration::from_yaml("prod.yaml", FULL_CONFIG_YAML).unwrap();

    assert_eq!(config.name, "prod.yaml");
    assert_eq!(config.target_keys().result_json, "testssl_result");
    assert_eq!(config.target_keys().result_metadata, "meta");
    // Unspecified aliases fall back to their logical names.
    assert_eq!(config.target_keys().cert_expires_in_days, "cert_expires_in_days");
    assert_eq!(config.target_keys().result_filename, "result_filename");

    assert_eq!(config.custom_groks["SCANID"], "[0-9a-f]{8}");
    assert!(config.path_properties_grok.is_some());
}

#[test]
fn triggers_keep_file_order() {
    let config = RuleConfiguration::from_yaml("prod.yaml", FULL_CONFIG_YAML).unwrap();
    let names: Vec<&str> = config.trigger_on.keys().map(|s| s.as_str()).collect();
    assert_eq!(names, vec!["weak_ciphers", "expiring"]);

    let weak = &config.trigger_on["weak_ciphers"];
    assert_eq!(weak.title, "Weak ciphers offered");
    assert_eq!(weak.reactors, vec!["slack", "archive"]);
}

#[test]
fn plugin_settings_captured_beside_class_name() {
    let config = RuleConfiguration::from_yaml("prod.yaml", FULL_CONFIG_YAML).unwrap();

    let slack = config.binding("slack").unwrap();
    assert_eq!(slack.class_name, "SlackReactor");
    assert_eq!(
        slack.settings["webhook_url"],
        serde_json::json!("https://hooks.example.com/T000/B000")
    );
    assert!(!slack.settings.contains_key("class_name"));

    let archive = config.binding("archive").unwrap();
    assert_eq!(archive.class_name, "CopyFileReactor");
    assert!(archive.settings_value().get("copy_to").is_some());
    assert!(config.binding("missing").is_none());
}

#[test]
fn minimal_configuration_uses_defaults() {
    let config = RuleConfiguration::from_yaml(
        "min.yml",
        "cert_expires_objectpath: \"$.x\"\n",
    )
    .unwrap();
    assert_eq!(config.target_keys(), &TargetKeys::default());
    assert!(config.trigger_on.is_empty());
    assert!(config.reactor_engines.is_empty());
    assert!(config.path_properties_grok.is_none());
}

#[test]
fn missing_expiry_expression_is_rejected() {
    assert!(RuleConfiguration::from_yaml("bad.yaml", "trigger_on: {}\n").is_err());
}

#[test]
fn trigger_without_reactors_defaults_empty() {
    let yaml = r#"
cert_expires_objectpath: "$.x"
trigger_on:
  t:
    title: T
    objectpath: "$.y"
"#;
    let config = RuleConfiguration::from_yaml("t.yaml", yaml).unwrap();
    assert!(config.trigger_on["t"].reactors.is_empty());
}
