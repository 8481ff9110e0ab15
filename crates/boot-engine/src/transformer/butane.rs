//! Butane to Ignition conversion
//!
//! A local, deterministic translation of Butane YAML into an Ignition JSON
//! config. The supported surface is the part of Butane that maps 1:1 onto
//! Ignition (`ignition`, `passwd`, `storage`, `systemd`, `kernel_arguments`):
//!
//! * `variant`/`version` select the Ignition spec version that is emitted
//! * inline resource contents become RFC 2397 `data:` URLs
//! * snake_case keys are renamed to Ignition's camelCase
//! * leading-zero `mode` values (`0644`) are read as octal
//!
//! Sugar that needs a local filesystem (`storage.trees`, `contents.local`,
//! `contents_local`) is rejected.

use crate::error::EngineError;
use crate::types::{Selector, Transformation};
use super::Transformer;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

/// Top-level sections that pass through to the Ignition config
const SECTIONS: [&str; 5] = ["ignition", "passwd", "storage", "systemd", "kernel_arguments"];

#[derive(Debug, Error)]
enum ButaneError {
    #[error("invalid Butane YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Butane config must be a mapping")]
    NotAMapping,

    #[error("missing required field {0:?}")]
    MissingField(&'static str),

    #[error("unsupported Butane variant/version {variant} {version}")]
    UnsupportedVersion { variant: String, version: String },

    #[error("unknown field {0:?}")]
    UnknownField(String),

    #[error("{0} is not supported")]
    Unsupported(String),

    #[error("invalid file mode {0}")]
    InvalidMode(String),
}

/// Map a Butane variant and version to the Ignition spec version it produces
fn ignition_version(variant: &str, version: &str) -> Option<&'static str> {
    match (variant, version) {
        ("fcos", "1.0.0") => Some("3.0.0"),
        ("fcos", "1.1.0") => Some("3.1.0"),
        ("fcos", "1.2.0" | "1.3.0") => Some("3.2.0"),
        ("fcos", "1.4.0") | ("flatcar", "1.0.0") => Some("3.3.0"),
        ("fcos", "1.5.0") | ("flatcar", "1.1.0") => Some("3.4.0"),
        ("fcos", "1.6.0") => Some("3.5.0"),
        _ => None,
    }
}

fn required_str<'a>(config: &'a Map<String, Value>, field: &'static str) -> Result<&'a str, ButaneError> {
    config
        .get(field)
        .and_then(Value::as_str)
        .ok_or(ButaneError::MissingField(field))
}

fn convert(payload: &[u8]) -> Result<Vec<u8>, ButaneError> {
    let Value::Object(mut config) = serde_yaml::from_slice::<Value>(payload)? else {
        return Err(ButaneError::NotAMapping);
    };

    let variant = required_str(&config, "variant")?.to_string();
    let version = required_str(&config, "version")?.to_string();
    let target = ignition_version(&variant, &version)
        .ok_or_else(|| ButaneError::UnsupportedVersion {
            variant: variant.clone(),
            version: version.clone(),
        })?;
    config.remove("variant");
    config.remove("version");

    if let Some(key) = config.keys().find(|k| !SECTIONS.contains(&k.as_str())) {
        return Err(ButaneError::UnknownField(key.clone()));
    }
    if config.contains_key("kernel_arguments") && target < "3.3.0" {
        return Err(ButaneError::Unsupported(format!(
            "kernel_arguments in {variant} {version}"
        )));
    }
    if config
        .get("storage")
        .and_then(|s| s.get("trees"))
        .is_some()
    {
        return Err(ButaneError::Unsupported("storage.trees".to_string()));
    }

    let mut ignition = match config.remove("ignition") {
        Some(Value::Object(section)) => section,
        Some(_) => return Err(ButaneError::Unsupported("non-mapping ignition section".to_string())),
        None => Map::new(),
    };
    if ignition.contains_key("version") {
        return Err(ButaneError::Unsupported("ignition.version".to_string()));
    }
    ignition.insert("version".to_string(), Value::String(target.to_string()));
    config.insert("ignition".to_string(), Value::Object(ignition));

    let output = to_ignition(Value::Object(config))?;
    Ok(output.to_string().into_bytes())
}

/// Rename keys and inline resources, recursively, inserting keys in sorted order
fn to_ignition(value: Value) -> Result<Value, ButaneError> {
    match value {
        Value::Object(map) => {
            let mut entries = Vec::with_capacity(map.len());
            for (key, child) in map {
                match key.as_str() {
                    "local" | "contents_local" => return Err(ButaneError::Unsupported(key)),
                    "inline" => {
                        let Value::String(text) = child else {
                            return Err(ButaneError::Unsupported("non-string inline contents".to_string()));
                        };
                        entries.push(("source".to_string(), Value::String(data_url(&text))));
                    }
                    "mode" => entries.push((key, file_mode(child)?)),
                    _ => entries.push((camel_case(&key), to_ignition(child)?)),
                }
            }
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Ok(Value::Object(entries.into_iter().collect()))
        }
        Value::Array(items) => items
            .into_iter()
            .map(to_ignition)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        scalar => Ok(scalar),
    }
}

/// Permission bits as an integer
///
/// YAML 1.2 leaves `0644` as a string; Butane reads it as octal.
fn file_mode(value: Value) -> Result<Value, ButaneError> {
    match value {
        Value::Number(n) if n.is_u64() => Ok(Value::Number(n)),
        Value::String(text) => text
            .strip_prefix('0')
            .filter(|digits| !digits.is_empty())
            .and_then(|digits| u64::from_str_radix(digits, 8).ok())
            .map(Value::from)
            .ok_or(ButaneError::InvalidMode(text)),
        other => Err(ButaneError::InvalidMode(other.to_string())),
    }
}

fn data_url(text: &str) -> String {
    format!("data:,{}", urlencoding::encode(text))
}

fn camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper = false;
    for c in key.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Converts Butane YAML payloads into Ignition JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct ButaneToIgnition;

#[async_trait::async_trait]
impl Transformer for ButaneToIgnition {
    async fn transform(
        &self,
        config: &Transformation,
        payload: Vec<u8>,
        _selector: &Selector,
    ) -> Result<Vec<u8>, EngineError> {
        if config != &Transformation::ButaneToIgnition {
            return Err(EngineError::Transform(format!(
                "ButaneToIgnition transformer cannot apply {} transformation",
                config.kind()
            )));
        }
        let output = convert(&payload).map_err(|e| EngineError::Transform(e.to_string()))?;
        debug!(input = payload.len(), output = output.len(), "Converted Butane to Ignition");
        Ok(output)
    }
}
