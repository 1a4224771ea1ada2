// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Wagate configuration system.

use std::io::Write;

use serial_test::serial;
use wagate_config::diagnostic::ConfigError;
use wagate_config::model::{RemoteBackend, WagateConfig};
use wagate_config::{load_and_validate, load_and_validate_str, load_config, load_config_from_str};

/// Valid TOML with all sections deserializes successfully.
#[test]
fn valid_toml_deserializes_into_wagate_config() {
    let toml = r#"
[server]
host = "127.0.0.1"
port = 8080
api_key = "k-123"
environment = "production"
connect_wait_ms = 500

[logging]
level = "debug"
format = "json"
output = "stderr"

[storage]
database_url = "sqlite:///tmp/wagate-test.db"
wal_mode = false

[remote]
backend = "loopback"
loopback_auto_pair_secs = 2

[runtime]
restore_concurrency = 2
reconnect_max_ms = 30000

[webhook]
global_url = "https://hooks.example.com/in"
max_retries = 5
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.server.bind_address(), "127.0.0.1:8080");
    assert_eq!(config.server.api_key.as_deref(), Some("k-123"));
    assert_eq!(config.server.connect_wait_ms, 500);
    assert_eq!(config.logging.format, "json");
    assert_eq!(config.logging.output, "stderr");
    assert!(!config.storage.wal_mode);
    assert_eq!(
        config.storage.database_path(),
        std::path::PathBuf::from("/tmp/wagate-test.db")
    );
    assert_eq!(config.remote.backend, RemoteBackend::Loopback);
    assert_eq!(config.remote.loopback_auto_pair_secs, Some(2));
    assert_eq!(config.runtime.restore_concurrency, 2);
    assert_eq!(config.runtime.reconnect_max_ms, 30_000);
    assert_eq!(
        config.webhook.global_url.as_deref(),
        Some("https://hooks.example.com/in")
    );
    assert_eq!(config.webhook.max_retries, 5);
}

/// Missing sections use the documented defaults.
#[test]
fn missing_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 3000);
    assert!(config.server.api_key.is_none());
    assert_eq!(config.server.environment, "development");
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.format, "text");
    assert!(config.storage.wal_mode);
    assert!(config.storage.database_url.ends_with("wagate.db"));
    assert_eq!(config.runtime.reconnect_initial_ms, 1000);
    assert_eq!(config.runtime.reconnect_max_ms, 60_000);
    assert_eq!(config.runtime.qr_max_attempts, 6);
    assert_eq!(config.runtime.restore_concurrency, 5);
    assert_eq!(config.runtime.restore_session_timeout_secs, 30);
    assert_eq!(config.runtime.restore_phase_timeout_secs, 90);
    assert_eq!(config.runtime.shutdown_timeout_secs, 30);
    assert_eq!(config.webhook.queue_capacity, 256);
    assert_eq!(config.webhook.max_retries, 3);
    assert_eq!(config.webhook.retry_base_ms, 5000);
    assert_eq!(config.webhook.timeout_secs, 30);
}

/// A typo in a key is reported as UnknownKey with a suggestion and a span.
#[test]
fn unknown_key_gets_suggestion() {
    let toml = r#"
[webhook]
global_ulr = "https://x"
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject unknown key");
    let unknown = errors
        .iter()
        .find_map(|e| match e {
            ConfigError::UnknownKey {
                key,
                suggestion,
                span,
                ..
            } => Some((key.clone(), suggestion.clone(), *span)),
            _ => None,
        })
        .expect("should contain an UnknownKey error");
    assert_eq!(unknown.0, "global_ulr");
    assert_eq!(unknown.1.as_deref(), Some("global_url"));
    assert!(unknown.2.is_some());
}

/// A wrong value type is reported with the offending key path.
#[test]
fn invalid_type_reports_key() {
    let errors = load_and_validate_str("[server]\nport = \"eighty\"\n").unwrap_err();
    assert!(errors.iter().any(|e| matches!(
        e,
        ConfigError::InvalidType { key, .. } if key.contains("port")
    )));
}

/// Validation errors surface after a successful parse.
#[test]
fn validation_errors_after_parse() {
    let errors = load_and_validate_str("[logging]\nformat = \"xml\"\n").unwrap_err();
    assert!(matches!(&errors[0], ConfigError::Validation { message } if message.contains("logging.format")));
}

/// `WAGATE_*` variables override files, using the explicit section map.
#[test]
#[serial]
fn env_vars_override_file_values() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "wagate.toml",
            r#"
[server]
port = 4000

[webhook]
max_retries = 1
"#,
        )?;
        jail.set_env("WAGATE_SERVER_PORT", "8081");
        jail.set_env("WAGATE_WEBHOOK_GLOBAL_URL", "https://global.example.com/hook");
        jail.set_env("WAGATE_API_KEY", "env-key");

        let config: WagateConfig = load_config()?;
        assert_eq!(config.server.port, 8081);
        assert_eq!(config.webhook.max_retries, 1);
        assert_eq!(
            config.webhook.global_url.as_deref(),
            Some("https://global.example.com/hook")
        );
        assert_eq!(config.server.api_key.as_deref(), Some("env-key"));
        Ok(())
    });
}

/// An explicit `--config` path is loaded and validated.
#[test]
#[serial]
fn explicit_path_is_loaded() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[server]\nport = 9999\napi_key = \"file-key\"").unwrap();

    let config = load_and_validate(Some(file.path())).expect("file config should validate");
    assert_eq!(config.server.port, 9999);
    assert_eq!(config.server.api_key.as_deref(), Some("file-key"));
}

/// Unknown keys in an explicit file carry the file as diagnostic source.
#[test]
#[serial]
fn explicit_path_unknown_key_has_span() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[runtime]\nqr_max_atempts = 3").unwrap();

    let errors = load_and_validate(Some(file.path())).unwrap_err();
    assert!(errors.iter().any(|e| matches!(
        e,
        ConfigError::UnknownKey { suggestion: Some(s), span: Some(_), .. } if s == "qr_max_attempts"
    )));
}
