//! Post-merge configuration validation.
//!
//! Validates that deserialized [`Config`](crate::Config) values are usable
//! by the bus, the store and the logging setup.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Log formats understood by the telemetry crate.
pub const LOG_FORMATS: [&str; 4] = ["pretty", "compact", "json", "full"];

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_bus(config)?;
    validate_store(config)?;
    validate_logging(config)?;
    Ok(())
}

fn non_empty(field: &str, value: &str) -> ConfigResult<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: field.to_owned(),
            message: "must not be empty".to_owned(),
        });
    }
    Ok(())
}

fn validate_bus(config: &Config) -> ConfigResult<()> {
    non_empty("bus.name", &config.bus.name)?;
    non_empty("bus.default_channel", &config.bus.default_channel)
}

fn validate_store(config: &Config) -> ConfigResult<()> {
    non_empty("store.name", &config.store.name)
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let logging = &config.logging;

    non_empty("logging.level", &logging.level)?;

    if !LOG_FORMATS.contains(&logging.format.as_str()) {
        return Err(ConfigError::ValidationError {
            field: "logging.format".to_owned(),
            message: format!(
                "unsupported format '{}'; expected one of: {}",
                logging.format,
                LOG_FORMATS.join(", ")
            ),
        });
    }

    if let Some(pos) = logging.directives.iter().position(|d| d.trim().is_empty()) {
        return Err(ConfigError::ValidationError {
            field: format!("logging.directives[{pos}]"),
            message: "directive must not be empty".to_owned(),
        });
    }

    Ok(())
}
