//! Config file loading with environment fallbacks.
//!
//! Implements the `Config::load()` algorithm:
//! 1. Parse `defaults.toml` → base
//! 2. Merge the configuration file, if one is given and exists
//! 3. Apply `PLEXUS_*` env var fallbacks for fields the file did not set
//! 4. Deserialize merged tree → `Config`
//! 5. Validate
//! 6. Return `ResolvedConfig`

use std::collections::{HashMap, HashSet};
use std::hash::BuildHasher;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Upper bound on the size of a configuration file.
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Mapping of an environment variable onto a dotted config field.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
}

const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "PLEXUS_BUS_NAME",
        field_path: "bus.name",
    },
    EnvMapping {
        var_name: "PLEXUS_DEFAULT_CHANNEL",
        field_path: "bus.default_channel",
    },
    EnvMapping {
        var_name: "PLEXUS_STORE_NAME",
        field_path: "store.name",
    },
    EnvMapping {
        var_name: "PLEXUS_LOG_LEVEL",
        field_path: "logging.level",
    },
    EnvMapping {
        var_name: "PLEXUS_LOG_FORMAT",
        field_path: "logging.format",
    },
];

/// A loaded configuration together with where its values came from.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The final, validated configuration.
    pub config: Config,
    /// Configuration files that were found and merged.
    pub loaded_files: Vec<String>,
    /// Dotted field paths that were filled from environment variables.
    pub env_overrides: Vec<String>,
}

/// Load configuration from the embedded defaults, an optional file and the
/// given environment.
///
/// A `path` that does not exist is skipped, not an error.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read or parsed, or if the
/// final merged configuration fails validation.
pub fn load<S: BuildHasher>(
    path: Option<&Path>,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<ResolvedConfig> {
    let mut merged = parse_defaults()?;
    let mut set_fields = HashSet::new();
    let mut loaded_files = Vec::new();

    if let Some(path) = path
        && let Some(overlay) = try_load_file(path)?
    {
        deep_merge(&mut merged, &overlay, "", &mut set_fields);
        loaded_files.push(path.display().to_string());
        info!(path = %path.display(), "loaded config file");
    }

    let env_overrides = apply_env_fallbacks(&mut merged, &set_fields, env_vars);

    let config = finish(merged, "<merged config>")?;
    Ok(ResolvedConfig {
        config,
        loaded_files,
        env_overrides,
    })
}

/// Parse a TOML document layered over the embedded defaults.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the document is malformed or the result
/// fails validation.
pub fn from_toml_str(content: &str) -> ConfigResult<Config> {
    let mut merged = parse_defaults()?;
    let overlay: toml::Value = toml::from_str(content).map_err(|e| ConfigError::ParseError {
        path: "<inline>".to_owned(),
        source: e,
    })?;
    deep_merge(&mut merged, &overlay, "", &mut HashSet::new());
    finish(merged, "<inline>")
}

/// Snapshot the process environment.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}

fn parse_defaults() -> ConfigResult<toml::Value> {
    toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
        path: "<embedded defaults>".to_owned(),
        source: e,
    })
}

fn finish(merged: toml::Value, origin: &str) -> ConfigResult<Config> {
    let config: Config = merged.try_into().map_err(|e| ConfigError::ParseError {
        path: origin.to_owned(),
        source: e,
    })?;
    validate::validate(&config)?;
    Ok(config)
}

fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    // Check size after reading to avoid TOCTOU between stat and read.
    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit",
                content.len()
            ),
        });
    }

    let value: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(Some(value))
}

/// Merge `overlay` into `base`, recording every leaf field the overlay set.
fn deep_merge(
    base: &mut toml::Value,
    overlay: &toml::Value,
    prefix: &str,
    set_fields: &mut HashSet<String>,
) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_value) in overlay_table {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                match base_table.get_mut(key) {
                    Some(existing) if existing.is_table() && overlay_value.is_table() => {
                        deep_merge(existing, overlay_value, &path, set_fields);
                    },
                    _ => {
                        base_table.insert(key.clone(), overlay_value.clone());
                        record_fields(overlay_value, &path, set_fields);
                    },
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
            record_fields(overlay, prefix, set_fields);
        },
    }
}

fn record_fields(value: &toml::Value, path: &str, set_fields: &mut HashSet<String>) {
    if let toml::Value::Table(table) = value {
        for (key, child) in table {
            record_fields(child, &format!("{path}.{key}"), set_fields);
        }
    } else {
        set_fields.insert(path.to_owned());
    }
}

fn apply_env_fallbacks<S: BuildHasher>(
    merged: &mut toml::Value,
    set_fields: &HashSet<String>,
    env_vars: &HashMap<String, String, S>,
) -> Vec<String> {
    let mut applied = Vec::new();

    for mapping in ENV_MAPPINGS {
        // Only apply if the config file did not set this field.
        if set_fields.contains(mapping.field_path) {
            continue;
        }

        if let Some(val) = env_vars.get(mapping.var_name) {
            debug!(
                var = mapping.var_name,
                field = mapping.field_path,
                "applying env var fallback"
            );
            set_field_from_string(merged, mapping.field_path, val);
            applied.push(mapping.field_path.to_owned());
        }
    }

    applied
}

fn set_field_from_string(merged: &mut toml::Value, field_path: &str, value: &str) {
    let mut current = merged;
    let mut segments = field_path.split('.').peekable();
    while let Some(segment) = segments.next() {
        let toml::Value::Table(table) = current else {
            return;
        };
        if segments.peek().is_none() {
            table.insert(segment.to_owned(), toml::Value::String(value.to_owned()));
            return;
        }
        current = table
            .entry(segment.to_owned())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }
}
