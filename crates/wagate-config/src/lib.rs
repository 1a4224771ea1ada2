// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Wagate session gateway.
//!
//! Provides TOML configuration parsing with strict validation (`deny_unknown_fields`),
//! XDG file hierarchy lookup, environment variable overrides, and diagnostic
//! error rendering with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use wagate_config::load_and_validate;
//!
//! let config = load_and_validate(None).expect("config errors");
//! println!("listening on {}", config.server.bind_address());
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::Path;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::WagateConfig;

/// Load configuration and validate it.
///
/// With `path`, reads that file (plus env overrides) instead of the XDG
/// hierarchy. Figment errors become diagnostics with source spans and typo
/// suggestions; validation errors are collected, not fail-fast.
pub fn load_and_validate(path: Option<&Path>) -> Result<WagateConfig, Vec<ConfigError>> {
    let loaded = match path {
        Some(p) => loader::load_config_from_path(p),
        None => loader::load_config(),
    };
    match loaded {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let sources = match path {
                Some(p) => read_source(p).into_iter().collect(),
                None => collect_toml_sources(),
            };
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

/// Load configuration from a TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<WagateConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let sources = vec![("<inline>".to_string(), toml_content.to_string())];
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

fn read_source(path: &Path) -> Option<(String, String)> {
    std::fs::read_to_string(path)
        .ok()
        .map(|content| (path.display().to_string(), content))
}

/// Collect TOML source file contents for error span resolution.
fn collect_toml_sources() -> Vec<(String, String)> {
    let mut sources = Vec::new();

    if let Ok(content) = std::fs::read_to_string("wagate.toml") {
        let path = std::env::current_dir()
            .map(|d| d.join("wagate.toml").display().to_string())
            .unwrap_or_else(|_| "wagate.toml".to_string());
        sources.push((path, content));
    }

    if let Some(config_dir) = dirs::config_dir()
        && let Some(source) = read_source(&config_dir.join("wagate/wagate.toml"))
    {
        sources.push(source);
    }

    if let Some(source) = read_source(Path::new("/etc/wagate/wagate.toml")) {
        sources.push(source);
    }

    sources
}
