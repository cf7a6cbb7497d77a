//! Plugin registry: the static catalog of known presets and plugins.
//!
//! The catalog is plain configuration data parsed from TOML. It never
//! changes during a session; runtime state lives in
//! [`PluginStateStore`](crate::state::PluginStateStore).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::PluginError;

/// Catalog shipped with the crate.
const BUILTIN_CATALOG: &str = include_str!("../catalog.toml");

/// Base location used when a locator does not name one.
pub const DEFAULT_BASE_URL: &str = "https://bundle.run";

// ─── Descriptor types ───────────────────────────────────────────────────

/// What kind of entry a descriptor is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PluginRole {
    /// A bundle of transformation rules applied as a unit.
    Preset,
    /// An optional transformation or output capability.
    Plugin,
    /// Support code needed only when compiled output is executed.
    Runtime,
}

/// Special behaviour a descriptor contributes to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// Appends a minifier preset after the regular presets.
    Minify,
    /// Pretty-prints the transformed text.
    Format,
    /// Environment-aware preset configured from target parameters.
    EnvTargets,
    /// Enables executing the transformed text.
    Evaluate,
}

/// Where to fetch a plugin's executable from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginLocator {
    #[serde(default)]
    pub base_url: Option<String>,
    pub package: String,
    pub version: String,
}

impl PluginLocator {
    /// Resolve the locator to a fetchable URL.
    pub fn url(&self, default_base: &str) -> String {
        let base = self.base_url.as_deref().unwrap_or(default_base);
        format!(
            "{}/{}@{}",
            base.trim_end_matches('/'),
            self.package,
            self.version
        )
    }
}

/// Immutable description of one catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    pub key: String,
    pub label: String,
    pub role: PluginRole,
    #[serde(default)]
    pub capability: Option<Capability>,
    /// Identifier contributed to the preset list; defaults to the label.
    #[serde(default)]
    pub preset_id: Option<String>,
    /// Ships with the base engine and is never fetched.
    #[serde(default)]
    pub preloaded: bool,
    #[serde(default)]
    pub locator: Option<PluginLocator>,
}

impl PluginDescriptor {
    /// Identifier used for this entry inside a pipeline.
    pub fn pipeline_id(&self) -> &str {
        self.preset_id.as_deref().unwrap_or(&self.label)
    }

    /// Name the fetched module must export to be usable.
    ///
    /// Derived from the package name, so `babili-standalone` resolves to
    /// `babiliStandalone`. Preloaded entries fall back to their key.
    pub fn export_name(&self) -> String {
        let source = self
            .locator
            .as_ref()
            .map_or(self.key.as_str(), |l| l.package.as_str());
        camel_case(source)
    }

    pub fn is_preset(&self) -> bool {
        self.role == PluginRole::Preset
    }
}

/// Convert a package name to its camel-cased export identity.
///
/// Words break on any non-alphanumeric character and on lower→upper case
/// transitions. The first word is lowercased; the rest are capitalized.
pub fn camel_case(name: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for ch in name.chars() {
        if !ch.is_ascii_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if ch.is_ascii_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = ch.is_ascii_lowercase() || ch.is_ascii_digit();
        current.push(ch);
    }
    if !current.is_empty() {
        words.push(current);
    }

    let mut out = String::with_capacity(name.len());
    for (i, word) in words.iter().enumerate() {
        let lower = word.to_ascii_lowercase();
        if i == 0 {
            out.push_str(&lower);
        } else {
            let mut chars = lower.chars();
            if let Some(first) = chars.next() {
                out.push(first.to_ascii_uppercase());
                out.extend(chars);
            }
        }
    }
    out
}

// ─── Validation helpers ─────────────────────────────────────────────────

/// Validate a descriptor key against `^[a-z][a-z0-9-]{1,63}$`.
fn validate_key(key: &str) -> Result<(), PluginError> {
    let len = key.len();
    if !(2..=64).contains(&len) {
        return Err(PluginError::InvalidCatalog(format!(
            "plugin key must be 2-64 characters, got {len} in '{key}'"
        )));
    }

    let mut chars = key.chars();
    if let Some(first) = chars.next() {
        if !first.is_ascii_lowercase() {
            return Err(PluginError::InvalidCatalog(format!(
                "plugin key must start with a lowercase letter, got '{first}'"
            )));
        }
    }

    for ch in chars {
        if !ch.is_ascii_lowercase() && !ch.is_ascii_digit() && ch != '-' {
            return Err(PluginError::InvalidCatalog(format!(
                "plugin key '{key}' contains invalid character '{ch}'"
            )));
        }
    }

    Ok(())
}

fn validate_locator(key: &str, locator: &PluginLocator) -> Result<(), PluginError> {
    if locator.package.trim().is_empty() {
        return Err(PluginError::InvalidCatalog(format!(
            "{key}: locator.package must not be empty"
        )));
    }

    semver::Version::parse(&locator.version).map_err(|_| {
        PluginError::InvalidCatalog(format!(
            "{key}: locator.version is not valid semver: '{}'",
            locator.version
        ))
    })?;

    if let Some(ref base) = locator.base_url {
        let parsed = url::Url::parse(base).map_err(|_| {
            PluginError::InvalidCatalog(format!("{key}: invalid base_url '{base}'"))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(PluginError::InvalidCatalog(format!(
                "{key}: base_url must be http(s), got scheme '{}'",
                parsed.scheme()
            )));
        }
    }

    Ok(())
}

// ─── Registry ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    plugin: Vec<PluginDescriptor>,
}

/// Ordered, validated catalog of plugin descriptors.
#[derive(Debug, Clone)]
pub struct PluginRegistry {
    descriptors: Vec<Arc<PluginDescriptor>>,
    index: HashMap<String, usize>,
}

impl PluginRegistry {
    /// The catalog shipped with the crate.
    pub fn builtin() -> Result<Self, PluginError> {
        Self::parse(BUILTIN_CATALOG)
    }

    /// Parse and validate a catalog from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, PluginError> {
        let file: CatalogFile = toml::from_str(toml_str)?;
        Self::from_descriptors(file.plugin)
    }

    /// Build a registry from descriptors, preserving their order.
    pub fn from_descriptors(descriptors: Vec<PluginDescriptor>) -> Result<Self, PluginError> {
        let mut index = HashMap::with_capacity(descriptors.len());
        let mut preset_labels = HashSet::new();
        let mut capabilities = HashSet::new();

        for (i, d) in descriptors.iter().enumerate() {
            validate_key(&d.key)?;

            if index.insert(d.key.clone(), i).is_some() {
                return Err(PluginError::InvalidCatalog(format!(
                    "duplicate plugin key '{}'",
                    d.key
                )));
            }

            if d.label.trim().is_empty() {
                return Err(PluginError::InvalidCatalog(format!(
                    "{}: label must not be empty",
                    d.key
                )));
            }

            if d.is_preset() && !preset_labels.insert(d.label.clone()) {
                return Err(PluginError::InvalidCatalog(format!(
                    "duplicate preset label '{}'",
                    d.label
                )));
            }

            if let Some(cap) = d.capability {
                if !capabilities.insert(cap) {
                    return Err(PluginError::InvalidCatalog(format!(
                        "{}: capability {cap:?} is already provided by another entry",
                        d.key
                    )));
                }
            }

            match (&d.locator, d.preloaded) {
                (Some(locator), _) => validate_locator(&d.key, locator)?,
                (None, false) => {
                    return Err(PluginError::InvalidCatalog(format!(
                        "{}: entries that are not preloaded need a locator",
                        d.key
                    )));
                }
                (None, true) => {}
            }
        }

        Ok(Self {
            descriptors: descriptors.into_iter().map(Arc::new).collect(),
            index,
        })
    }

    pub fn get(&self, key: &str) -> Option<&Arc<PluginDescriptor>> {
        self.index.get(key).map(|&i| &self.descriptors[i])
    }

    /// Find a preset by the label it is persisted under.
    pub fn preset_by_label(&self, label: &str) -> Option<&Arc<PluginDescriptor>> {
        self.descriptors
            .iter()
            .find(|d| d.is_preset() && d.label == label)
    }

    /// The single entry providing a capability, if any.
    pub fn with_capability(&self, capability: Capability) -> Option<&Arc<PluginDescriptor>> {
        self.descriptors
            .iter()
            .find(|d| d.capability == Some(capability))
    }

    /// Descriptors in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<PluginDescriptor>> {
        self.descriptors.iter()
    }

    /// Position of a key in catalog order.
    pub fn position(&self, key: &str) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[[plugin]]
key = "babel-preset-react"
label = "react"
role = "preset"
preloaded = true

[[plugin]]
key = "prettier"
label = "Prettify"
role = "plugin"
capability = "format"
locator = { package = "prettier-standalone", version = "1.3.1" }
"#;

    // ── Built-in catalog ────────────────────────────────────────────

    #[test]
    fn test_builtin_catalog_parses() {
        let registry = PluginRegistry::builtin().unwrap();
        assert!(registry.len() >= 13);
        assert!(registry.get("babel-preset-es2015").unwrap().preloaded);
        assert!(!registry.get("babel-preset-env").unwrap().preloaded);
    }

    #[test]
    fn test_builtin_capabilities_are_unique_and_present() {
        let registry = PluginRegistry::builtin().unwrap();
        assert_eq!(
            registry.with_capability(Capability::Minify).unwrap().key,
            "babili-standalone"
        );
        assert_eq!(
            registry.with_capability(Capability::Format).unwrap().key,
            "prettier"
        );
        assert_eq!(
            registry.with_capability(Capability::EnvTargets).unwrap().key,
            "babel-preset-env"
        );
        assert_eq!(
            registry.with_capability(Capability::Evaluate).unwrap().key,
            "babel-polyfill"
        );
    }

    #[test]
    fn test_builtin_preserves_order() {
        let registry = PluginRegistry::builtin().unwrap();
        let es2015 = registry.position("babel-preset-es2015").unwrap();
        let react = registry.position("babel-preset-react").unwrap();
        let stage2 = registry.position("babel-preset-stage-2").unwrap();
        assert!(es2015 < react && react < stage2);
    }

    #[test]
    fn test_preset_by_label() {
        let registry = PluginRegistry::builtin().unwrap();
        assert_eq!(
            registry.preset_by_label("stage-2").unwrap().key,
            "babel-preset-stage-2"
        );
        assert!(registry.preset_by_label("Prettify").is_none());
        assert!(registry.preset_by_label("bogus").is_none());
    }

    // ── Descriptor helpers ──────────────────────────────────────────

    #[test]
    fn test_pipeline_id_defaults_to_label() {
        let registry = PluginRegistry::builtin().unwrap();
        assert_eq!(registry.get("babel-preset-react").unwrap().pipeline_id(), "react");
        assert_eq!(registry.get("babili-standalone").unwrap().pipeline_id(), "babili");
    }

    #[test]
    fn test_export_name_from_package() {
        let registry = PluginRegistry::parse(MINIMAL).unwrap();
        assert_eq!(
            registry.get("prettier").unwrap().export_name(),
            "prettierStandalone"
        );
    }

    #[test]
    fn test_locator_url() {
        let locator = PluginLocator {
            base_url: None,
            package: "babili-standalone".into(),
            version: "0.1.4".into(),
        };
        assert_eq!(
            locator.url(DEFAULT_BASE_URL),
            "https://bundle.run/babili-standalone@0.1.4"
        );

        let custom = PluginLocator {
            base_url: Some("https://cdn.example.com/".into()),
            ..locator
        };
        assert_eq!(
            custom.url(DEFAULT_BASE_URL),
            "https://cdn.example.com/babili-standalone@0.1.4"
        );
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("babili-standalone"), "babiliStandalone");
        assert_eq!(camel_case("babel-preset-env-standalone"), "babelPresetEnvStandalone");
        assert_eq!(camel_case("prettier"), "prettier");
        assert_eq!(camel_case("Foo_Bar baz"), "fooBarBaz");
        assert_eq!(camel_case("fooBar"), "fooBar");
        assert_eq!(camel_case("babel-preset-es2015"), "babelPresetEs2015");
        assert_eq!(camel_case("--"), "");
    }

    // ── Validation ──────────────────────────────────────────────────

    #[test]
    fn test_reject_duplicate_key() {
        let toml = r#"
[[plugin]]
key = "react"
label = "react"
role = "preset"
preloaded = true

[[plugin]]
key = "react"
label = "react2"
role = "preset"
preloaded = true
"#;
        let err = PluginRegistry::parse(toml).unwrap_err();
        assert!(matches!(err, PluginError::InvalidCatalog(_)));
        assert!(err.to_string().contains("duplicate plugin key"));
    }

    #[test]
    fn test_reject_uppercase_key() {
        let toml = r#"
[[plugin]]
key = "React"
label = "react"
role = "preset"
preloaded = true
"#;
        let err = PluginRegistry::parse(toml).unwrap_err();
        assert!(err.to_string().contains("lowercase"));
    }

    #[test]
    fn test_reject_remote_entry_without_locator() {
        let toml = r#"
[[plugin]]
key = "prettier"
label = "Prettify"
role = "plugin"
"#;
        let err = PluginRegistry::parse(toml).unwrap_err();
        assert!(err.to_string().contains("need a locator"));
    }

    #[test]
    fn test_reject_bad_version() {
        let toml = r#"
[[plugin]]
key = "prettier"
label = "Prettify"
role = "plugin"
locator = { package = "prettier-standalone", version = "latest" }
"#;
        let err = PluginRegistry::parse(toml).unwrap_err();
        assert!(err.to_string().contains("semver"));
    }

    #[test]
    fn test_reject_non_http_base_url() {
        let toml = r#"
[[plugin]]
key = "prettier"
label = "Prettify"
role = "plugin"
locator = { base_url = "file:///etc", package = "prettier-standalone", version = "1.0.0" }
"#;
        let err = PluginRegistry::parse(toml).unwrap_err();
        assert!(err.to_string().contains("http(s)"));
    }

    #[test]
    fn test_reject_duplicate_capability() {
        let toml = r#"
[[plugin]]
key = "prettier"
label = "Prettify"
role = "plugin"
capability = "format"
locator = { package = "prettier-standalone", version = "1.0.0" }

[[plugin]]
key = "other-formatter"
label = "Format"
role = "plugin"
capability = "format"
locator = { package = "other", version = "1.0.0" }
"#;
        let err = PluginRegistry::parse(toml).unwrap_err();
        assert!(err.to_string().contains("already provided"));
    }

    #[test]
    fn test_unknown_role_is_parse_error() {
        let toml = r#"
[[plugin]]
key = "prettier"
label = "Prettify"
role = "widget"
preloaded = true
"#;
        let err = PluginRegistry::parse(toml).unwrap_err();
        assert!(matches!(err, PluginError::TomlParse(_)));
    }

    #[test]
    fn test_empty_catalog() {
        let registry = PluginRegistry::parse("").unwrap();
        assert!(registry.is_empty());
    }
}
