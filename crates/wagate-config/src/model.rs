// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Wagate session gateway.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Wagate configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WagateConfig {
    /// HTTP listener and authentication.
    #[serde(default)]
    pub server: ServerConfig,

    /// Log level, format and destination.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// SQLite database and keystore settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Remote network backend.
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Session runtime tuning.
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Webhook delivery.
    #[serde(default)]
    pub webhook: WebhookConfig,
}

/// HTTP listener configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// API key required on every authenticated route. `serve` refuses to
    /// start without one.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Free-form environment label (`development`, `production`, `test`, ...).
    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// How long `POST /sessions/{id}/connect` waits for a QR or a connection
    /// before replying.
    #[serde(default = "default_connect_wait_ms")]
    pub connect_wait_ms: u64,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("environment", &self.environment)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("connect_wait_ms", &self.connect_wait_ms)
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_key: None,
            environment: default_environment(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_wait_ms: default_connect_wait_ms(),
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn connect_wait(&self) -> Duration {
        Duration::from_millis(self.connect_wait_ms)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_connect_wait_ms() -> u64 {
    3000
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `text` or `json`.
    #[serde(default = "default_log_format")]
    pub format: String,

    /// `stdout`, `stderr`, or a file path to append to.
    #[serde(default = "default_log_output")]
    pub output: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            output: default_log_output(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_output() -> String {
    "stdout".to_string()
}

/// Storage configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// `sqlite://<path>` or a bare filesystem path.
    #[serde(default = "default_database_url")]
    pub database_url: String,

    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,

    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// 64 hex characters. When absent a key file next to the database is
    /// created on first start and reused.
    #[serde(default)]
    pub keystore_key: Option<String>,

    #[serde(default = "default_operation_timeout_secs")]
    pub operation_timeout_secs: u64,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("database_url", &self.database_url)
            .field("wal_mode", &self.wal_mode)
            .field("busy_timeout_ms", &self.busy_timeout_ms)
            .field("keystore_key", &self.keystore_key.as_ref().map(|_| "[redacted]"))
            .field("operation_timeout_secs", &self.operation_timeout_secs)
            .finish()
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            wal_mode: default_wal_mode(),
            busy_timeout_ms: default_busy_timeout_ms(),
            keystore_key: None,
            operation_timeout_secs: default_operation_timeout_secs(),
        }
    }
}

impl StorageConfig {
    /// Filesystem path of the database, with any `sqlite:` scheme removed.
    pub fn database_path(&self) -> PathBuf {
        let url = self.database_url.trim();
        let path = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .unwrap_or(url);
        PathBuf::from(path)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }
}

fn default_database_url() -> String {
    dirs::data_dir()
        .map(|d| format!("sqlite://{}", d.join("wagate/wagate.db").display()))
        .unwrap_or_else(|| "sqlite://wagate.db".to_string())
}

fn default_wal_mode() -> bool {
    true
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_operation_timeout_secs() -> u64 {
    10
}

/// Which remote network implementation backs the sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteBackend {
    /// In-process stand-in for the remote network.
    #[default]
    Loopback,
}

/// Remote network configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteConfig {
    #[serde(default)]
    pub backend: RemoteBackend,

    /// Log level applied to the remote client's own tracing target.
    #[serde(default = "default_remote_log_level")]
    pub log_level: String,

    /// Pair automatically this many seconds after a QR is issued.
    #[serde(default)]
    pub loopback_auto_pair_secs: Option<u64>,

    #[serde(default = "default_loopback_qr_interval_secs")]
    pub loopback_qr_interval_secs: u64,

    /// QR codes issued per pairing attempt before the client gives up.
    #[serde(default = "default_loopback_qr_codes")]
    pub loopback_qr_codes: u32,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            backend: RemoteBackend::default(),
            log_level: default_remote_log_level(),
            loopback_auto_pair_secs: None,
            loopback_qr_interval_secs: default_loopback_qr_interval_secs(),
            loopback_qr_codes: default_loopback_qr_codes(),
        }
    }
}

fn default_remote_log_level() -> String {
    "warn".to_string()
}

fn default_loopback_qr_interval_secs() -> u64 {
    20
}

fn default_loopback_qr_codes() -> u32 {
    6
}

/// Session runtime configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    #[serde(default = "default_command_buffer")]
    pub command_buffer: usize,

    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,

    #[serde(default = "default_true")]
    pub auto_reconnect: bool,

    #[serde(default = "default_reconnect_initial_ms")]
    pub reconnect_initial_ms: u64,

    #[serde(default = "default_reconnect_max_ms")]
    pub reconnect_max_ms: u64,

    /// Relative jitter applied to each reconnect delay, in `[0, 1]`.
    #[serde(default = "default_reconnect_jitter")]
    pub reconnect_jitter: f64,

    #[serde(default = "default_qr_max_attempts")]
    pub qr_max_attempts: u32,

    #[serde(default = "default_qr_grace_secs")]
    pub qr_grace_secs: u64,

    #[serde(default = "default_restore_concurrency")]
    pub restore_concurrency: usize,

    #[serde(default = "default_restore_session_timeout_secs")]
    pub restore_session_timeout_secs: u64,

    #[serde(default = "default_restore_phase_timeout_secs")]
    pub restore_phase_timeout_secs: u64,

    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,

    #[serde(default = "default_last_seen_flush_secs")]
    pub last_seen_flush_secs: u64,

    #[serde(default = "default_true")]
    pub ledger_enabled: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            command_buffer: default_command_buffer(),
            event_buffer: default_event_buffer(),
            connect_timeout_secs: default_connect_timeout_secs(),
            send_timeout_secs: default_send_timeout_secs(),
            auto_reconnect: true,
            reconnect_initial_ms: default_reconnect_initial_ms(),
            reconnect_max_ms: default_reconnect_max_ms(),
            reconnect_jitter: default_reconnect_jitter(),
            qr_max_attempts: default_qr_max_attempts(),
            qr_grace_secs: default_qr_grace_secs(),
            restore_concurrency: default_restore_concurrency(),
            restore_session_timeout_secs: default_restore_session_timeout_secs(),
            restore_phase_timeout_secs: default_restore_phase_timeout_secs(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
            last_seen_flush_secs: default_last_seen_flush_secs(),
            ledger_enabled: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_command_buffer() -> usize {
    64
}

fn default_event_buffer() -> usize {
    512
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_send_timeout_secs() -> u64 {
    30
}

fn default_reconnect_initial_ms() -> u64 {
    1000
}

fn default_reconnect_max_ms() -> u64 {
    60_000
}

fn default_reconnect_jitter() -> f64 {
    0.2
}

fn default_qr_max_attempts() -> u32 {
    6
}

fn default_qr_grace_secs() -> u64 {
    15
}

fn default_restore_concurrency() -> usize {
    5
}

fn default_restore_session_timeout_secs() -> u64 {
    30
}

fn default_restore_phase_timeout_secs() -> u64 {
    90
}

fn default_shutdown_timeout_secs() -> u64 {
    30
}

fn default_last_seen_flush_secs() -> u64 {
    30
}

/// Webhook delivery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookConfig {
    /// Fallback endpoint for sessions without a webhook of their own.
    #[serde(default)]
    pub global_url: Option<String>,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,

    #[serde(default = "default_retry_jitter_ms")]
    pub retry_jitter_ms: u64,

    #[serde(default = "default_webhook_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            global_url: None,
            queue_capacity: default_queue_capacity(),
            max_retries: default_max_retries(),
            retry_base_ms: default_retry_base_ms(),
            retry_jitter_ms: default_retry_jitter_ms(),
            timeout_secs: default_webhook_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_queue_capacity() -> usize {
    256
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_ms() -> u64 {
    5000
}

fn default_retry_jitter_ms() -> u64 {
    1000
}

fn default_webhook_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("wagate-webhook/{}", env!("CARGO_PKG_VERSION"))
}
