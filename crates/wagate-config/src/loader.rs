// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./wagate.toml` > `~/.config/wagate/wagate.toml` > `/etc/wagate/wagate.toml`
//! with environment variable overrides via `WAGATE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::WagateConfig;

/// Top-level sections, in the order env keys are matched against them.
const SECTIONS: &[&str] = &["server", "logging", "storage", "remote", "runtime", "webhook"];

/// Short env names accepted for the most common settings.
const ALIASES: &[(&str, &str)] = &[
    ("host", "server.host"),
    ("port", "server.port"),
    ("api_key", "server.api_key"),
    ("environment", "server.environment"),
    ("log_level", "logging.level"),
    ("log_format", "logging.format"),
    ("log_output", "logging.output"),
    ("database_url", "storage.database_url"),
    ("remote_log_level", "remote.log_level"),
    ("webhook_url", "webhook.global_url"),
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/wagate/wagate.toml` (system-wide)
/// 3. `~/.config/wagate/wagate.toml` (user XDG config)
/// 4. `./wagate.toml` (local directory)
/// 5. `WAGATE_*` environment variables
pub fn load_config() -> Result<WagateConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<WagateConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WagateConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<WagateConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WagateConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(WagateConfig::default()))
        .merge(Toml::file("/etc/wagate/wagate.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("wagate/wagate.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("wagate.toml"))
        .merge(env_provider())
}

/// Map a lowercased, prefix-stripped env key to its dotted config path.
///
/// Uses an explicit section map rather than splitting on `_`, since field
/// names contain underscores: `WAGATE_WEBHOOK_GLOBAL_URL` must become
/// `webhook.global_url`, not `webhook.global.url`.
pub fn map_env_key(key: &str) -> String {
    if let Some((_, path)) = ALIASES.iter().find(|(alias, _)| *alias == key) {
        return (*path).to_string();
    }
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

fn env_provider() -> Env {
    Env::prefixed("WAGATE_").map(|key| map_env_key(key.as_str()).into())
}
