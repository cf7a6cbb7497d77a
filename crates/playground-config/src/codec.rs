//! Merging storage and locator sources into a [`PersistedConfig`], and back.
//!
//! Locator fields override storage fields one at a time. A locator carrying
//! only `code` still inherits every other field from storage.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::compress::{compress, decompress};
use crate::error::ConfigError;
use crate::locator::{format_locator, parse_locator};
use crate::persisted::{
    parse_presets, PersistedConfig, BOOL_FIELDS, KEY_BROWSERS, KEY_CODE, KEY_PRESETS, KEY_TARGETS,
};
use crate::targets::parse_targets;

/// Locator field carrying compressed source text.
pub const KEY_CODE_COMPRESSED: &str = "code_lz";

#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub config: PersistedConfig,
    /// Fields that were ignored or defaulted, for diagnostics.
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    /// JSON object for the key-value store.
    pub storage_blob: String,
    /// Fragment-style `name=value` list, without a leading `#`.
    pub locator: String,
}

pub fn decode(storage_blob: Option<&str>, locator: Option<&str>) -> Decoded {
    let mut warnings = Vec::new();
    let mut fields: HashMap<String, String> = HashMap::new();

    if let Some(blob) = storage_blob.filter(|b| !b.trim().is_empty()) {
        fields.extend(storage_fields(blob, &mut warnings));
    }
    if let Some(locator) = locator {
        fields.extend(locator_fields(locator, &mut warnings));
    }

    let config = build_config(&fields, &mut warnings);
    for warning in &warnings {
        tracing::warn!(warning = %warning, "persisted config field ignored");
    }
    Decoded { config, warnings }
}

pub fn encode(config: &PersistedConfig) -> Result<Encoded, ConfigError> {
    let fields = config.to_fields();

    let blob: Map<String, Value> = fields
        .iter()
        .map(|(key, value)| (key.to_string(), Value::String(value.clone())))
        .collect();
    let storage_blob = serde_json::to_string(&Value::Object(blob))?;

    let code_token = compress(&config.code)?;
    let locator = format_locator(fields.iter().map(|(key, value)| {
        if *key == KEY_CODE {
            (KEY_CODE_COMPRESSED, code_token.as_str())
        } else {
            (*key, value.as_str())
        }
    }));

    Ok(Encoded {
        storage_blob,
        locator,
    })
}

// ─── Sources ────────────────────────────────────────────────────────────

fn storage_fields(blob: &str, warnings: &mut Vec<String>) -> HashMap<String, String> {
    let object = match serde_json::from_str::<Value>(blob) {
        Ok(Value::Object(object)) => object,
        Ok(_) => {
            warnings.push("stored config is not a JSON object".to_string());
            return HashMap::new();
        }
        Err(e) => {
            warnings.push(format!("stored config is malformed: {e}"));
            return HashMap::new();
        }
    };

    let mut fields = HashMap::new();
    for (key, value) in object {
        let text = match value {
            Value::String(s) => s,
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::Null => continue,
            other => {
                warnings.push(format!("stored field \"{key}\" has unsupported value {other}"));
                continue;
            }
        };
        fields.insert(key, text);
    }
    fields
}

fn locator_fields(locator: &str, warnings: &mut Vec<String>) -> HashMap<String, String> {
    let mut fields: HashMap<String, String> = parse_locator(locator).into_iter().collect();

    if let Some(token) = fields.remove(KEY_CODE_COMPRESSED) {
        match decompress(&token) {
            Ok(code) => {
                fields.insert(KEY_CODE.to_string(), code);
            }
            Err(e) => warnings.push(format!("could not decompress shared code: {e}")),
        }
    }
    fields
}

// ─── Typed projection ───────────────────────────────────────────────────

fn build_config(fields: &HashMap<String, String>, warnings: &mut Vec<String>) -> PersistedConfig {
    let mut config = PersistedConfig::default();

    if let Some(code) = fields.get(KEY_CODE) {
        config.code = code.clone();
    }
    if let Some(presets) = fields.get(KEY_PRESETS) {
        config.presets = parse_presets(presets);
    }
    if let Some(browsers) = fields.get(KEY_BROWSERS) {
        config.browsers = browsers.clone();
    }
    if let Some(targets) = fields.get(KEY_TARGETS) {
        let parsed = parse_targets(targets);
        config.targets = parsed.params;
        warnings.extend(parsed.warnings);
    }

    for &(key, default) in BOOL_FIELDS {
        let Some(raw) = fields.get(key) else { continue };
        let value = match parse_bool(raw) {
            Some(v) => v,
            None => {
                warnings.push(format!(
                    "field \"{key}\" has non-boolean value \"{raw}\", using {default}"
                ));
                default
            }
        };
        if let Some(slot) = config.flag_mut(key) {
            *slot = value;
        }
    }

    config
}

fn parse_bool(raw: &str) -> Option<bool> {
    if raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────
