//! The persisted projection of playground state.
//!
//! Only user intent survives: enabled sets, flags, targets and the source.
//! Transient plugin state never reaches this type.

use crate::targets::{format_targets, TargetParams};

pub const KEY_CODE: &str = "code";
pub const KEY_PRESETS: &str = "presets";
pub const KEY_BABILI: &str = "babili";
pub const KEY_PRETTIER: &str = "prettier";
pub const KEY_EVALUATE: &str = "evaluate";
pub const KEY_LINE_WRAP: &str = "lineWrap";
pub const KEY_BUILT_INS: &str = "builtIns";
pub const KEY_DEBUG: &str = "debug";
pub const KEY_SHOW_SIDEBAR: &str = "showSidebar";
pub const KEY_BROWSERS: &str = "browsers";
pub const KEY_TARGETS: &str = "targets";

/// Preset labels enabled when nothing says otherwise.
pub const DEFAULT_PRESETS: &[&str] = &["es2015", "react", "stage-2"];

/// Boolean fields with their defaults, in serialization order.
pub(crate) const BOOL_FIELDS: &[(&str, bool)] = &[
    (KEY_BABILI, false),
    (KEY_PRETTIER, false),
    (KEY_EVALUATE, false),
    (KEY_LINE_WRAP, true),
    (KEY_BUILT_INS, false),
    (KEY_DEBUG, false),
    (KEY_SHOW_SIDEBAR, true),
];

#[derive(Debug, Clone, PartialEq)]
pub struct PersistedConfig {
    pub code: String,
    /// Enabled preset labels.
    pub presets: Vec<String>,
    pub babili: bool,
    pub prettier: bool,
    pub evaluate: bool,
    pub line_wrap: bool,
    pub built_ins: bool,
    pub debug: bool,
    pub show_sidebar: bool,
    pub browsers: String,
    pub targets: TargetParams,
}

impl Default for PersistedConfig {
    fn default() -> Self {
        Self {
            code: String::new(),
            presets: DEFAULT_PRESETS.iter().map(|p| p.to_string()).collect(),
            babili: false,
            prettier: false,
            evaluate: false,
            line_wrap: true,
            built_ins: false,
            debug: false,
            show_sidebar: true,
            browsers: String::new(),
            targets: TargetParams::default(),
        }
    }
}

impl PersistedConfig {
    pub(crate) fn flag(&self, key: &str) -> Option<bool> {
        Some(match key {
            KEY_BABILI => self.babili,
            KEY_PRETTIER => self.prettier,
            KEY_EVALUATE => self.evaluate,
            KEY_LINE_WRAP => self.line_wrap,
            KEY_BUILT_INS => self.built_ins,
            KEY_DEBUG => self.debug,
            KEY_SHOW_SIDEBAR => self.show_sidebar,
            _ => return None,
        })
    }

    pub(crate) fn flag_mut(&mut self, key: &str) -> Option<&mut bool> {
        Some(match key {
            KEY_BABILI => &mut self.babili,
            KEY_PRETTIER => &mut self.prettier,
            KEY_EVALUATE => &mut self.evaluate,
            KEY_LINE_WRAP => &mut self.line_wrap,
            KEY_BUILT_INS => &mut self.built_ins,
            KEY_DEBUG => &mut self.debug,
            KEY_SHOW_SIDEBAR => &mut self.show_sidebar,
            _ => return None,
        })
    }

    /// Flat `key → string` fields in canonical order.
    pub fn to_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            (KEY_CODE, self.code.clone()),
            (KEY_PRESETS, self.presets.join(",")),
        ];
        for &(key, _) in BOOL_FIELDS {
            let value = self.flag(key).unwrap_or_default();
            fields.push((key, value.to_string()));
        }
        fields.push((KEY_BROWSERS, self.browsers.clone()));
        fields.push((KEY_TARGETS, format_targets(&self.targets)));
        fields
    }

    pub fn has_preset(&self, label: &str) -> bool {
        self.presets.iter().any(|p| p == label)
    }
}

/// Split a comma-joined preset list, dropping empty entries.
pub fn parse_presets(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}
