//! Configuration document parsing and version checks

use crate::config::types::{Variables, RESERVED_KEYS, VERSION_KEY};
use crate::error::{ConfigError, ConfigResult};
use crate::runner::template::Local;
use semver::Version;
use serde_yaml::{Mapping, Value};
use std::path::Path;
use std::sync::LazyLock;

/// Configuration file used when none is given on the command line
pub const DEFAULT_CONFIG_FILE: &str = "djin.yml";

static ENGINE_VERSION: LazyLock<Version> =
    LazyLock::new(|| Version::parse(crate::VERSION).expect("crate version is valid semver"));

/// Parse the text of a djin file into its top-level mapping
pub fn parse_document(content: &str, path: &Path) -> ConfigResult<Mapping> {
    let value: Value = serde_yaml::from_str(content).map_err(|e| invalid(path, e.to_string()))?;

    match value {
        Value::Mapping(map) => Ok(map),
        Value::Null => Ok(Mapping::new()),
        _ => Err(invalid(path, "expected a hash at the top level")),
    }
}

/// The declared `djin_version` of a document
pub fn schema_version(document: &Mapping, path: &Path) -> ConfigResult<String> {
    match document.get(VERSION_KEY) {
        None | Some(Value::Null) => Err(ConfigError::MissingVersion(path.to_path_buf())),
        Some(Value::String(version)) => Ok(version.clone()),
        Some(Value::Number(version)) => Ok(version.to_string()),
        Some(_) => Err(invalid(path, format!("{} must be a string", VERSION_KEY))),
    }
}

/// Fail unless `declared` is lower than or equal to the running version
pub fn ensure_supported(declared: &str, path: &Path) -> ConfigResult<()> {
    let version = parse_version(declared)
        .ok_or_else(|| invalid(path, format!("invalid {} '{}'", VERSION_KEY, declared)))?;

    if version > *ENGINE_VERSION {
        return Err(ConfigError::VersionNotSupported {
            declared: declared.to_string(),
            current: crate::VERSION.to_string(),
        });
    }

    Ok(())
}

/// Parse a semantic version, padding missing minor and patch numbers
pub fn parse_version(text: &str) -> Option<Version> {
    let text = text.trim();
    let text = text.strip_prefix('v').unwrap_or(text);

    if let Ok(version) = Version::parse(text) {
        return Some(version);
    }

    let mut parts: Vec<&str> = text.split('.').collect();
    let numeric = |part: &&str| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit());
    if parts.len() > 3 || !parts.iter().all(numeric) {
        return None;
    }
    while parts.len() < 3 {
        parts.push("0");
    }

    Version::parse(&parts.join(".")).ok()
}

/// Read the `variables` key
pub fn parse_variables(document: &Mapping, path: &Path) -> ConfigResult<Variables> {
    let map = match document.get("variables") {
        None | Some(Value::Null) => return Ok(Variables::new()),
        Some(Value::Mapping(map)) => map,
        Some(_) => return Err(invalid(path, "variables must be a hash")),
    };

    let mut variables = Variables::new();
    for (key, value) in map {
        let Some(key) = scalar_text(key) else {
            tracing::debug!(?key, "skipping variable with a non scalar name");
            continue;
        };
        let local = match value {
            Value::Bool(flag) => Local::Flag(*flag),
            Value::Null => Local::Text(String::new()),
            other => match scalar_text(other) {
                Some(text) => Local::Text(text),
                None => {
                    tracing::debug!(variable = %key, "skipping variable with a non scalar value");
                    continue;
                }
            },
        };
        variables.insert(key, local);
    }

    Ok(variables)
}

/// Task definitions of a document as written, and whether they come from
/// the deprecated top-level layout
pub fn task_section(document: &Mapping, path: &Path) -> ConfigResult<(Mapping, bool)> {
    match document.get("tasks") {
        Some(Value::Mapping(tasks)) => Ok((tasks.clone(), false)),
        Some(Value::Null) => Ok((Mapping::new(), false)),
        Some(_) => Err(invalid(path, "tasks must be a hash")),
        None => {
            let legacy: Mapping = document
                .iter()
                .filter(|(key, _)| {
                    key.as_str().is_some_and(|name| {
                        !RESERVED_KEYS.contains(&name) && !name.starts_with('_')
                    })
                })
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            let is_legacy = !legacy.is_empty();
            Ok((legacy, is_legacy))
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn invalid(path: &Path, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidConfigFile {
        path: path.to_path_buf(),
        message: message.into(),
    }
}
