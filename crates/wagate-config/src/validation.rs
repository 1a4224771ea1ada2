// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes:
//! non-empty hosts, ordered backoff bounds, well-formed URLs and keys.

use crate::diagnostic::ConfigError;
use crate::model::WagateConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];
const LOG_FORMATS: &[&str] = &["text", "json"];

fn is_http_url(url: &str) -> bool {
    url.strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .is_some_and(|rest| !rest.is_empty())
}

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &WagateConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let server = &config.server;
    if server.host.trim().is_empty() {
        errors.push(ConfigError::validation("server.host must not be empty"));
    } else {
        let host = server.host.trim();
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::validation(format!(
                "server.host `{host}` is not a valid IP address or hostname"
            )));
        }
    }
    if server.port == 0 && server.environment != "test" {
        errors.push(ConfigError::validation(
            "server.port must be between 1 and 65535",
        ));
    }
    if let Some(key) = &server.api_key
        && key.trim().is_empty()
    {
        errors.push(ConfigError::validation(
            "server.api_key must not be empty when set",
        ));
    }
    if server.request_timeout_secs == 0 {
        errors.push(ConfigError::validation(
            "server.request_timeout_secs must be at least 1",
        ));
    }

    let logging = &config.logging;
    if !LOG_LEVELS.contains(&logging.level.as_str()) {
        errors.push(ConfigError::validation(format!(
            "logging.level must be one of {}, got `{}`",
            LOG_LEVELS.join(", "),
            logging.level
        )));
    }
    if !LOG_FORMATS.contains(&logging.format.as_str()) {
        errors.push(ConfigError::validation(format!(
            "logging.format must be `text` or `json`, got `{}`",
            logging.format
        )));
    }
    if logging.output.trim().is_empty() {
        errors.push(ConfigError::validation("logging.output must not be empty"));
    }

    let storage = &config.storage;
    if storage.database_path().as_os_str().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_url must name a database file",
        ));
    }
    if let Some(key) = &storage.keystore_key
        && (key.len() != 64 || hex::decode(key).is_err())
    {
        errors.push(ConfigError::validation(
            "storage.keystore_key must be exactly 64 hex characters",
        ));
    }
    if storage.operation_timeout_secs == 0 {
        errors.push(ConfigError::validation(
            "storage.operation_timeout_secs must be at least 1",
        ));
    }

    let remote = &config.remote;
    if !LOG_LEVELS.contains(&remote.log_level.as_str()) {
        errors.push(ConfigError::validation(format!(
            "remote.log_level must be one of {}, got `{}`",
            LOG_LEVELS.join(", "),
            remote.log_level
        )));
    }
    if remote.loopback_qr_interval_secs == 0 {
        errors.push(ConfigError::validation(
            "remote.loopback_qr_interval_secs must be at least 1",
        ));
    }
    if remote.loopback_qr_codes == 0 {
        errors.push(ConfigError::validation(
            "remote.loopback_qr_codes must be at least 1",
        ));
    }

    let runtime = &config.runtime;
    if runtime.command_buffer == 0 || runtime.event_buffer == 0 {
        errors.push(ConfigError::validation(
            "runtime.command_buffer and runtime.event_buffer must be at least 1",
        ));
    }
    if runtime.reconnect_initial_ms == 0 {
        errors.push(ConfigError::validation(
            "runtime.reconnect_initial_ms must be at least 1",
        ));
    }
    if runtime.reconnect_initial_ms > runtime.reconnect_max_ms {
        errors.push(ConfigError::validation(format!(
            "runtime.reconnect_initial_ms ({}) must not exceed runtime.reconnect_max_ms ({})",
            runtime.reconnect_initial_ms, runtime.reconnect_max_ms
        )));
    }
    if !(0.0..=1.0).contains(&runtime.reconnect_jitter) {
        errors.push(ConfigError::validation(format!(
            "runtime.reconnect_jitter must be between 0 and 1, got {}",
            runtime.reconnect_jitter
        )));
    }
    if runtime.qr_max_attempts == 0 {
        errors.push(ConfigError::validation(
            "runtime.qr_max_attempts must be at least 1",
        ));
    }
    if runtime.restore_concurrency == 0 {
        errors.push(ConfigError::validation(
            "runtime.restore_concurrency must be at least 1",
        ));
    }
    if runtime.restore_session_timeout_secs > runtime.restore_phase_timeout_secs {
        errors.push(ConfigError::validation(
            "runtime.restore_session_timeout_secs must not exceed runtime.restore_phase_timeout_secs",
        ));
    }
    if runtime.connect_timeout_secs == 0 || runtime.send_timeout_secs == 0 {
        errors.push(ConfigError::validation(
            "runtime.connect_timeout_secs and runtime.send_timeout_secs must be at least 1",
        ));
    }

    let webhook = &config.webhook;
    if let Some(url) = &webhook.global_url
        && !is_http_url(url)
    {
        errors.push(ConfigError::validation(format!(
            "webhook.global_url must be an http or https URL, got `{url}`"
        )));
    }
    if webhook.queue_capacity == 0 {
        errors.push(ConfigError::validation(
            "webhook.queue_capacity must be at least 1",
        ));
    }
    if webhook.timeout_secs == 0 {
        errors.push(ConfigError::validation(
            "webhook.timeout_secs must be at least 1",
        ));
    }
    if webhook.user_agent.trim().is_empty() {
        errors.push(ConfigError::validation(
            "webhook.user_agent must not be empty",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
