//! `config` subcommands and TOML dotted-key helpers.
//!
//! Handlers return what they would print so they can be tested without
//! capturing stdout; [`handle_config_command`] does the printing.

use std::path::{Path, PathBuf};

use sentiview_core::config::PROJECT_NAME;
use sentiview_core::{Error, Result, SentiviewConfig};

use crate::cli::ConfigAction;

// ============================================================================
// Dispatch
// ============================================================================

/// Runs a `config` subcommand and prints its output.
pub fn handle_config_command(config_path: Option<&str>, action: ConfigAction) -> Result<()> {
    let output = match action {
        ConfigAction::Path => {
            let (path, exists) = config_path_status(config_path)?;
            if !exists {
                eprintln!("(file does not exist, run `{PROJECT_NAME} config init` to create it)");
            }
            path.display().to_string()
        }
        ConfigAction::Get { key } => config_get(config_path, &key)?,
        ConfigAction::Set { key, value } => {
            let path = config_set(config_path, &key, &value)?;
            format!("Set {key} = {value} in {}", path.display())
        }
        ConfigAction::Init { file, force } => {
            let path = config_init(file.as_deref().or(config_path), force)?;
            format!("Config file created at {}", path.display())
        }
    };
    println!("{output}");
    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

/// The resolved config path and whether it exists.
pub fn config_path_status(config_path: Option<&str>) -> Result<(PathBuf, bool)> {
    let path = SentiviewConfig::resolve_config_path(config_path)
        .ok_or_else(|| Error::config("Could not determine config directory for this platform"))?;
    let exists = path.exists();
    Ok((path, exists))
}

/// The value at a dotted key of the effective configuration.
pub fn config_get(config_path: Option<&str>, key: &str) -> Result<String> {
    let config = SentiviewConfig::load(config_path)?;
    let value = toml::Value::try_from(&config).map_err(|e| Error::config(e.to_string()))?;
    get_nested_value(&value, key)
        .map(format_toml_value)
        .ok_or_else(|| Error::config(format!("Key '{key}' not found in configuration")))
}

/// Writes a dotted key into the config file, which must already exist.
pub fn config_set(config_path: Option<&str>, key: &str, value: &str) -> Result<PathBuf> {
    let (path, exists) = config_path_status(config_path)?;
    if !exists {
        return Err(Error::config(format!(
            "Config file does not exist at {}. Run `{PROJECT_NAME} config init` first.",
            path.display()
        )));
    }

    let raw = std::fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
    let mut doc: toml::Value = toml::from_str(&raw)
        .map_err(|e| Error::config(format!("Failed to parse {}: {e}", path.display())))?;
    set_nested_value(&mut doc, key, parse_value(value))?;

    // The result must still be a valid config.
    let rendered = toml::to_string_pretty(&doc).map_err(|e| Error::config(e.to_string()))?;
    toml::from_str::<SentiviewConfig>(&rendered)
        .map_err(|e| Error::config(format!("'{key} = {value}' is not a valid setting: {e}")))?;

    write_file(&path, &rendered)?;
    Ok(path)
}

/// Writes a default config file.
pub fn config_init(file: Option<&str>, force: bool) -> Result<PathBuf> {
    let path = match file {
        Some(p) => PathBuf::from(p),
        None => SentiviewConfig::default_config_path()
            .ok_or_else(|| Error::config("Could not determine config directory"))?,
    };
    if path.exists() && !force {
        return Err(Error::config(format!(
            "Config file already exists at {}. Use --force to overwrite.",
            path.display()
        )));
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    write_file(&path, &SentiviewConfig::default().to_toml_string()?)?;
    Ok(path)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).map_err(|e| Error::io(path, e))
}

// ============================================================================
// TOML dotted-key helpers
// ============================================================================

/// Follows a dotted key through nested tables.
pub fn get_nested_value<'a>(value: &'a toml::Value, key: &str) -> Option<&'a toml::Value> {
    key.split('.')
        .try_fold(value, |current, part| current.as_table()?.get(part))
}

/// Sets a dotted key, creating intermediate tables.
pub fn set_nested_value(root: &mut toml::Value, key: &str, value: toml::Value) -> Result<()> {
    let (parents, last) = match key.rsplit_once('.') {
        Some((parents, last)) => (Some(parents), last),
        None => (None, key),
    };
    if last.is_empty() {
        return Err(Error::config("Empty key path"));
    }

    let mut current = root;
    for part in parents.into_iter().flat_map(|p| p.split('.')) {
        let table = current
            .as_table_mut()
            .ok_or_else(|| Error::config(format!("Cannot navigate into '{part}'")))?;
        current = table
            .entry(part.to_string())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }
    current
        .as_table_mut()
        .ok_or_else(|| Error::config(format!("Cannot set '{last}' on a non-table value")))?
        .insert(last.to_string(), value);
    Ok(())
}

/// Reads a CLI string as the most specific TOML scalar: bool, integer,
/// float, then string.
pub fn parse_value(s: &str) -> toml::Value {
    match s {
        "true" => toml::Value::Boolean(true),
        "false" => toml::Value::Boolean(false),
        _ => s
            .parse::<i64>()
            .map(toml::Value::Integer)
            .or_else(|_| s.parse::<f64>().map(toml::Value::Float))
            .unwrap_or_else(|_| toml::Value::String(s.to_string())),
    }
}

/// Renders a value for stdout; scalars bare, tables as TOML.
pub fn format_toml_value(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Integer(i) => i.to_string(),
        toml::Value::Float(f) => f.to_string(),
        toml::Value::Boolean(b) => b.to_string(),
        toml::Value::Datetime(dt) => dt.to_string(),
        toml::Value::Array(_) | toml::Value::Table(_) => {
            toml::to_string_pretty(value).unwrap_or_else(|_| format!("{value:?}"))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
