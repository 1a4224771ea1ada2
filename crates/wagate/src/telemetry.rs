// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tracing subscriber and Prometheus recorder setup.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use wagate_config::model::LoggingConfig;
use wagate_core::WagateError;

/// Renders the current metric values in Prometheus text format.
pub type MetricsRender = Arc<dyn Fn() -> String + Send + Sync>;

/// Filter used when `RUST_LOG` is unset. The remote backend gets its own level.
pub fn default_directives(level: &str, remote_level: &str) -> String {
    format!("warn,wagate={level},wagate_remote={remote_level}")
}

fn writer(output: &str) -> Result<BoxMakeWriter, WagateError> {
    Ok(match output {
        "stdout" => BoxMakeWriter::new(std::io::stdout),
        "stderr" => BoxMakeWriter::new(std::io::stderr),
        path => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| WagateError::Config(format!("cannot open log file {path}: {e}")))?;
            BoxMakeWriter::new(Arc::new(file))
        }
    })
}

/// Install the global tracing subscriber. `RUST_LOG` overrides the
/// configured level.
pub fn init_tracing(logging: &LoggingConfig, remote_level: &str) -> Result<(), WagateError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&logging.level, remote_level)));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(writer(&logging.output)?);

    let installed = if logging.format == "json" {
        builder.json().try_init()
    } else {
        builder.with_ansi(logging.output == "stdout").try_init()
    };
    installed.map_err(|e| WagateError::Internal(format!("tracing init failed: {e}")))
}

/// Install the Prometheus recorder and describe the gateway's metrics.
pub fn install_metrics() -> Result<MetricsRender, WagateError> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| WagateError::Internal(format!("failed to install Prometheus recorder: {e}")))?;
    wagate_core::metrics::register_metrics();
    tracing::info!("prometheus metrics recorder installed");
    Ok(Arc::new(move || handle.render()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_level_is_scoped() {
        let directives = default_directives("debug", "error");
        assert_eq!(directives, "warn,wagate=debug,wagate_remote=error");
        assert!(EnvFilter::try_new(directives).is_ok());
    }

    #[test]
    fn file_output_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wagate.log");
        assert!(writer(path.to_str().unwrap()).is_ok());
        assert!(path.exists());
    }

    #[test]
    fn unwritable_log_path_is_a_config_error() {
        let err = writer("/nonexistent-dir/wagate.log").err().unwrap();
        assert!(matches!(err, WagateError::Config(_)));
    }
}
