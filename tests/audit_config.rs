use std::collections::HashMap;

use integrity_guard::audit::{AuditLog, AuditRecord};
use integrity_guard::config::GuardConfig;
use integrity_guard::{analyze, GuardError, PostInput};

#[test]
fn audit_record_keeps_verbatim_json() {
    let post = PostInput::new("According to the news", "Details inside")
        .with_links(["https://example.org/n"]);
    let result = analyze(&post).unwrap();
    let record = AuditRecord::new(&post, &result).unwrap();

    assert_eq!(record.platform, "facebook");
    assert_eq!(record.input_json, serde_json::to_string(&post).unwrap());
    assert_eq!(record.output_json, serde_json::to_string(&result).unwrap());
    assert_eq!(record.input().unwrap(), post);
    assert_eq!(record.output().unwrap(), result);
}

#[test]
fn audit_log_appends_jsonl() {
    let dir = tempfile::tempdir().unwrap();
    let log = AuditLog::new(dir.path().join("nested").join("audit.jsonl"));
    assert!(log.read_all().unwrap().is_empty());

    let first = PostInput::new("Garden update", "Photos");
    let second = PostInput::new("Shocking secret", "Share now").with_links(["https://bit.ly/q"]);
    for post in [&first, &second] {
        let result = analyze(post).unwrap();
        log.append(&AuditRecord::new(post, &result).unwrap()).unwrap();
    }

    let records = log.read_all().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].input().unwrap(), first);
    assert_eq!(records[1].input().unwrap(), second);
    assert_eq!(records[1].output().unwrap().signals.low_quality_landing, 0.6);

    let text = std::fs::read_to_string(log.path()).unwrap();
    assert_eq!(text.lines().count(), 2);
}

#[test]
fn config_defaults_disable_advisory() {
    let config = GuardConfig::default();
    assert!(!config.advisory.is_enabled());
    assert_eq!(config.advisory.timeout_secs, 15);
    assert!(config.audit_log.is_none());
    assert!(config.validate().is_ok());
}

#[test]
fn config_reads_toml() {
    let config = GuardConfig::from_toml_str(
        r#"
        audit_log = "var/audit.jsonl"

        [advisory]
        provider = "gemini"
        api_key = "secret-key"
        timeout_secs = 5
        "#,
    )
    .unwrap();
    assert!(config.advisory.is_enabled());
    assert_eq!(config.advisory.model, "gemini-1.5-flash");
    assert_eq!(config.advisory.timeout_secs, 5);
    assert_eq!(
        config.audit_log.as_deref(),
        Some(std::path::Path::new("var/audit.jsonl"))
    );
}

#[test]
fn config_rejects_bad_toml() {
    let err = GuardConfig::from_toml_str("advisory = 3").unwrap_err();
    assert!(matches!(err, GuardError::Config(_)));
}

#[test]
fn environment_overrides_file() {
    let env: HashMap<&str, &str> = [
        ("LLM_PROVIDER", " Gemini "),
        ("GEMINI_API_KEY", "k"),
        ("GEMINI_MODEL", "gemini-pro"),
        ("INTEGRITY_AUDIT_LOG", "/tmp/a.jsonl"),
    ]
    .into_iter()
    .collect();

    let mut config = GuardConfig::default();
    config.apply_env(|key| env.get(key).map(|v| v.to_string()));
    assert_eq!(config.advisory.provider, "gemini");
    assert!(config.advisory.is_enabled());
    assert_eq!(config.advisory.model, "gemini-pro");
    assert!(config.audit_log.is_some());
}

#[test]
fn unknown_provider_stays_disabled() {
    let mut config = GuardConfig::default();
    config.apply_env(|key| match key {
        "LLM_PROVIDER" => Some("openai".to_string()),
        "GEMINI_API_KEY" => Some("k".to_string()),
        _ => None,
    });
    assert!(!config.advisory.is_enabled());
}

#[test]
fn validate_rejects_zero_timeout() {
    let mut config = GuardConfig::default();
    config.advisory.timeout_secs = 0;
    assert!(matches!(config.validate(), Err(GuardError::Config(_))));

    let mut config = GuardConfig::default();
    config.advisory.model = " ".to_string();
    assert!(matches!(config.validate(), Err(GuardError::Config(_))));
}
