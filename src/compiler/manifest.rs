//! Extension manifest (`package.json` inside the output directory).

use serde::Serialize;
use serde_json::Value;
use std::{fs, path::Path};

use anyhow::{Context, Result};

use crate::package::{Engines, PackageMetadata};

/// Category used when the host package does not declare any.
pub const DEFAULT_CATEGORY: &str = "Themes";

/// Base UI theme used when neither the descriptor nor the module names one.
pub const DEFAULT_UI_THEME: &str = "vs-dark";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributedTheme {
    pub label: String,
    /// Relative to the output directory, e.g. `./midnight-0.json`
    pub path: String,
    pub ui_theme: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Contributes {
    pub themes: Vec<ContributedTheme>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub name: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub publisher: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<Value>,
    pub categories: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engines: Option<Engines>,
    pub contributes: Contributes,
}

impl Manifest {
    /// Start a manifest from host package metadata; themes are added later.
    pub fn new(name: String, display_name: String, publisher: String, package: &PackageMetadata) -> Self {
        let json = &package.json;
        Self {
            name,
            display_name,
            version: json.version.clone(),
            description: json.description.clone(),
            publisher,
            keywords: json.keywords.clone(),
            repository: json.repository.clone(),
            categories: json
                .categories
                .clone()
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| vec![DEFAULT_CATEGORY.to_string()]),
            engines: json
                .engines
                .clone()
                .filter(|engines| engines.vscode.is_some()),
            contributes: Contributes::default(),
        }
    }

    pub fn push_theme(&mut self, theme: ContributedTheme) {
        self.contributes.themes.push(theme);
    }

    pub fn theme_count(&self) -> usize {
        self.contributes.themes.len()
    }

    /// Write as 2-space indented JSON.
    pub fn write(&self, path: &Path) -> Result<()> {
        let mut content = serde_json::to_string_pretty(self)?;
        content.push('\n');
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
    }
}
