//! # Logging Setup
//!
//! Installs a global `tracing` subscriber from a [`LoggingConfig`].
//!
//! `RUST_LOG` wins over the configured level when set, so a single module can be
//! turned up without editing the config:
//! ```text
//! RUST_LOG=hexabus::transport=trace
//! ```

use crate::config::LoggingConfig;
use crate::error::{HexabusError, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber.
///
/// Fails with `ConfigError` when the configuration does not validate, the log
/// file cannot be opened, or a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let problems = config.validate();
    if !problems.is_empty() {
        return Err(HexabusError::ConfigError(problems.join("; ")));
    }

    let mut layers: Vec<BoxedLayer> = Vec::new();

    if config.log_to_console {
        layers.push(if config.json_format {
            fmt::layer().json().boxed()
        } else {
            fmt::layer().with_thread_names(true).boxed()
        });
    }

    if config.log_to_file {
        if let Some(path) = &config.log_file_path {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    HexabusError::ConfigError(format!("Failed to open log file {path}: {e}"))
                })?;
            let writer = Mutex::new(file);
            layers.push(if config.json_format {
                fmt::layer().json().with_writer(writer).boxed()
            } else {
                fmt::layer().with_ansi(false).with_writer(writer).boxed()
            });
        }
    }

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(config.log_level).into())
        .from_env_lossy();

    Registry::default()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| HexabusError::ConfigError(format!("Logging already initialized: {e}")))?;

    info!(app = %config.app_name, level = %config.log_level, "Logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_config_is_rejected_before_install() {
        let config = LoggingConfig {
            log_to_console: false,
            log_to_file: false,
            ..LoggingConfig::default()
        };
        assert!(matches!(
            init_logging(&config),
            Err(HexabusError::ConfigError(_))
        ));
    }
}
