use bushel::load_config::load_config;
use bushel_core::FetchOptions;
use serial_test::serial;
use std::env;
use std::fs::write;
use tempfile::NamedTempFile;

fn config_file(contents: &str) -> NamedTempFile {
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), contents).unwrap();
    config_file
}

/// A full config maps onto fetch options and picks secrets up from the environment.
#[test]
#[serial]
fn test_load_config_full_file_and_env_secrets() {
    let config_yaml = r#"
fetch:
  betas: false
  community_wiki: false
  only_source: appledb.dev
publish:
  endpoint: https://store.example/api/
  batch_size: 50
"#;
    let config_file = config_file(config_yaml);

    env::set_var("BUSHEL_PUBLISH_TOKEN", "publish-token");
    env::set_var("VIRTUALBUDDY_API_KEY", "vb-key");

    let config = load_config(config_file.path()).expect("Config should load");

    let options = config.fetch.to_options();
    assert!(!options.include_betas);
    assert!(!options.include_community_wiki);
    assert!(options.include_restore_images);
    assert!(options.include_signing_verification);
    assert!(!options.force);
    assert_eq!(options.only_source.as_deref(), Some("appledb.dev"));

    let publish = config.publish.expect("publish section");
    assert_eq!(publish.endpoint, "https://store.example/api/");
    assert_eq!(publish.batch_size, 50);

    assert_eq!(config.secrets.publish_token.as_deref(), Some("publish-token"));
    assert_eq!(config.secrets.virtualbuddy_api_key.as_deref(), Some("vb-key"));
}

/// Missing sections fall back to defaults; empty env values count as absent.
#[test]
#[serial]
fn test_load_config_defaults() {
    let config_file = config_file("publish:\n  endpoint: https://store.example\n");

    env::set_var("BUSHEL_PUBLISH_TOKEN", "");
    env::remove_var("VIRTUALBUDDY_API_KEY");

    let config = load_config(config_file.path()).expect("Config should load");

    assert_eq!(config.fetch.to_options(), FetchOptions::default());
    assert_eq!(config.publish.unwrap().batch_size, 200);
    assert_eq!(config.secrets.publish_token, None);
    assert_eq!(config.secrets.virtualbuddy_api_key, None);
}

#[test]
#[serial]
fn test_load_config_empty_file_is_all_defaults() {
    let config_file = config_file("");

    let config = load_config(config_file.path()).expect("Empty config should load");

    assert!(config.publish.is_none());
    assert_eq!(config.fetch.to_options(), FetchOptions::default());
}

#[test]
#[serial]
fn test_load_config_rejects_unknown_keys() {
    let config_file = config_file("fetch:\n  bettas: false\n");

    let err = load_config(config_file.path()).unwrap_err();
    assert!(err.to_string().contains("parse"), "got: {err}");
}

#[test]
#[serial]
fn test_load_config_rejects_bad_publish_section() {
    let empty_endpoint = config_file("publish:\n  endpoint: \"  \"\n");
    let err = load_config(empty_endpoint.path()).unwrap_err();
    assert!(err.to_string().contains("endpoint"), "got: {err}");

    let zero_batch = config_file("publish:\n  endpoint: https://store.example\n  batch_size: 0\n");
    let err = load_config(zero_batch.path()).unwrap_err();
    assert!(err.to_string().contains("batch_size"), "got: {err}");

    let missing_endpoint = config_file("publish:\n  batch_size: 10\n");
    assert!(load_config(missing_endpoint.path()).is_err());
}

#[test]
#[serial]
fn test_load_config_errors_for_invalid_file() {
    let config_file = config_file("not-yaml: [:::");

    let err = load_config(config_file.path()).unwrap_err();
    let msg = err.to_string();
    assert!(
        msg.contains("parse") || msg.contains("YAML"),
        "Parse error expected, got: {msg}"
    );
}

#[test]
#[serial]
fn test_load_config_errors_for_missing_file() {
    let err = load_config("/definitely/not/here.yaml").unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}
