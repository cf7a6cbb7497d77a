//! Target parameter grammar: `[!]name-value[,[!]name-value...]`.
//!
//! Names are matched case-insensitively. A leading `!` marks a target that
//! is switched off but keeps its version. A bad component is skipped with a
//! warning and never stops the rest of the string from parsing.

/// A target version and whether it is applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetVersion {
    pub version: f64,
    pub enabled: bool,
}

impl TargetVersion {
    pub fn enabled(version: f64) -> Self {
        Self {
            version,
            enabled: true,
        }
    }

    pub fn disabled(version: f64) -> Self {
        Self {
            version,
            enabled: false,
        }
    }

    /// Apply a user change to a target slot.
    ///
    /// A new version replaces the stored one. Without a version only the
    /// enabled flag changes; an empty slot stays empty since there is
    /// nothing to enable.
    pub fn update(slot: &mut Option<TargetVersion>, enabled: bool, version: Option<f64>) {
        match (version.filter(|v| v.is_finite()), slot.as_mut()) {
            (Some(version), _) => *slot = Some(TargetVersion { version, enabled }),
            (None, Some(target)) => target.enabled = enabled,
            (None, None) => {}
        }
    }

    fn active(slot: Option<TargetVersion>) -> Option<f64> {
        slot.filter(|t| t.enabled).map(|t| t.version)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetParams {
    pub electron: Option<TargetVersion>,
    pub node: Option<TargetVersion>,
}

impl TargetParams {
    /// Electron version, only when enabled.
    pub fn active_electron(&self) -> Option<f64> {
        TargetVersion::active(self.electron)
    }

    pub fn active_node(&self) -> Option<f64> {
        TargetVersion::active(self.node)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedTargets {
    pub params: TargetParams,
    pub warnings: Vec<String>,
}

pub fn parse_targets(input: &str) -> ParsedTargets {
    let decoded = urlencoding::decode(input)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| input.to_string());
    let mut parsed = ParsedTargets::default();

    for component in decoded.split(',').map(str::trim).filter(|c| !c.is_empty()) {
        let (enabled, body) = match component.strip_prefix('!') {
            Some(rest) => (false, rest.trim_start()),
            None => (true, component),
        };
        let Some((name, raw_value)) = body.split_once('-') else {
            parsed
                .warnings
                .push(format!("env target \"{component}\" has no value"));
            continue;
        };

        let name = name.trim().to_ascii_lowercase();
        let version = match raw_value.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => v,
            _ => {
                parsed.warnings.push(format!(
                    "env target \"{name}\" has invalid version \"{raw_value}\""
                ));
                continue;
            }
        };

        let slot = match name.as_str() {
            "electron" => &mut parsed.params.electron,
            "node" => &mut parsed.params.node,
            _ => {
                parsed
                    .warnings
                    .push(format!("unknown env target \"{name}\" specified"));
                continue;
            }
        };
        *slot = Some(TargetVersion { version, enabled });
    }

    parsed
}

/// Serialize every target that has a version, e.g. `Electron-1.2,!Node-8`.
pub fn format_targets(params: &TargetParams) -> String {
    [("Electron", params.electron), ("Node", params.node)]
        .into_iter()
        .filter_map(|(name, slot)| {
            slot.map(|t| {
                let marker = if t.enabled { "" } else { "!" };
                format!("{marker}{name}-{}", t.version)
            })
        })
        .collect::<Vec<_>>()
        .join(",")
}
