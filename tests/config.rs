use std::time::Duration;

use assert_matches::assert_matches;

use kira_efetch::config::{ConfigLoader, ConfigOverrides};
use kira_efetch::error::KiraError;

#[test]
fn load_json_config() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("kira-ef.json");
    std::fs::write(
        &path,
        r#"{
            "schema_version": 1,
            "efetch": "/opt/edirect/efetch",
            "browser": "chromium",
            "retry": { "initial_wait_secs": 1, "max_attempts": 5 },
            "timeout_secs": 120
        }"#,
    )
    .unwrap();

    let resolved =
        ConfigLoader::resolve(path.to_str(), &ConfigOverrides::default()).unwrap();
    assert_eq!(resolved.efetch, "/opt/edirect/efetch");
    assert_eq!(resolved.browser, "chromium");
    assert_eq!(
        resolved.search_url,
        "https://www.ncbi.nlm.nih.gov/nuccore/?term="
    );
    assert_eq!(resolved.retry.initial_wait, Duration::from_secs(1));
    assert_eq!(resolved.retry.max_attempts, Some(5));
    assert_eq!(resolved.timeout, Some(Duration::from_secs(120)));
    assert_eq!(resolved.source.as_deref(), Some(path.as_path()));
}

#[test]
fn explicit_missing_config_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("nope.json");
    let err = ConfigLoader::resolve(path.to_str(), &ConfigOverrides::default()).unwrap_err();
    assert_matches!(err, KiraError::MissingConfig(_));
}

#[test]
fn invalid_json_is_a_parse_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("kira-ef.json");
    std::fs::write(&path, "{ \"retry\": 3 }").unwrap();
    let err = ConfigLoader::resolve(path.to_str(), &ConfigOverrides::default()).unwrap_err();
    assert_matches!(err, KiraError::ConfigParse(_));
}

#[test]
fn zero_initial_wait_in_file_is_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("kira-ef.json");
    std::fs::write(&path, r#"{ "retry": { "initial_wait_secs": 0 } }"#).unwrap();
    let err = ConfigLoader::resolve(path.to_str(), &ConfigOverrides::default()).unwrap_err();
    assert_matches!(err, KiraError::InvalidConfig(_));
}

#[test]
fn lenient_resolve_falls_back_on_broken_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("kira-ef.json");
    std::fs::write(&path, "{ not json").unwrap();

    let resolved = ConfigLoader::resolve_lenient(path.to_str(), &ConfigOverrides::default());
    assert_eq!(resolved.browser, "firefox");
    assert_eq!(
        resolved.search_url,
        "https://www.ncbi.nlm.nih.gov/nuccore/?term="
    );
    assert_eq!(resolved.source, None);
}

#[test]
fn lenient_resolve_reads_valid_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("kira-ef.json");
    std::fs::write(&path, r#"{ "browser": "chromium" }"#).unwrap();

    let resolved = ConfigLoader::resolve_lenient(path.to_str(), &ConfigOverrides::default());
    assert_eq!(resolved.browser, "chromium");
}
