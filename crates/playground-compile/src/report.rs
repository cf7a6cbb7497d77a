//! Debug report of what the env preset decided for the configured targets.

use serde::{Deserialize, Serialize};

/// Raw env-preset result returned alongside transformed code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvReport {
    /// Resolved target versions, in the order the preset reported them.
    #[serde(default)]
    pub targets: Vec<(String, String)>,
    #[serde(default)]
    pub plugins: Vec<String>,
    /// Only present when built-ins were requested.
    #[serde(default)]
    pub polyfills: Vec<String>,
}

impl EnvReport {
    /// Render as bullet sections separated by a blank line.
    ///
    /// Empty sections are left out entirely.
    pub fn render(&self) -> String {
        let mut sections = Vec::new();

        if !self.targets.is_empty() {
            let lines: Vec<String> = self
                .targets
                .iter()
                .map(|(name, version)| format!("• {name}: {version}"))
                .collect();
            sections.push(format!("Using targets:\n{}", lines.join("\n")));
        }

        if !self.plugins.is_empty() {
            sections.push(format!("Using plugins:\n{}", bullets(&self.plugins)));
        }

        if !self.polyfills.is_empty() {
            sections.push(format!("Using polyfills:\n{}", bullets(&self.polyfills)));
        }

        sections.join("\n\n")
    }
}

fn bullets(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("• {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}
