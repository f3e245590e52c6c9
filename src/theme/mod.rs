//! Declarative theme modules.
//!
//! A theme module is a JSON or TOML document:
//!
//! ```toml
//! label = "Midnight"
//! ui_theme = "vs-dark"
//!
//! [colors]
//! "editor.background" = "#1e1e2e"
//!
//! [[token_colors]]
//! scope = ["comment"]
//! settings = { foreground = "rgb(108, 112, 134)", fontStyle = "italic" }
//! ```
//!
//! Keys other than the ones modelled here (e.g. `semanticTokenColors`) are
//! passed through to the compiled theme unchanged.

mod color;

pub use color::{ColorError, Rgba, normalize as normalize_color};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("theme module `{0}` does not exist")]
    Missing(PathBuf),

    #[error("failed to read theme module `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("theme module `{0}` must be a .json or .toml file")]
    UnsupportedFormat(PathBuf),

    #[error("failed to parse theme module `{0}`")]
    Json(PathBuf, #[source] serde_json::Error),

    #[error("failed to parse theme module `{0}`")]
    Toml(PathBuf, #[source] toml::de::Error),

    #[error("invalid color at `{key}`")]
    Color {
        key: String,
        #[source]
        source: ColorError,
    },
}

/// Scope selector of a token color rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scope {
    One(String),
    Many(Vec<String>),
}

/// Formatting applied to a scope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreground: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default, alias = "font_style", skip_serializing_if = "Option::is_none")]
    pub font_style: Option<String>,
}

/// A TextMate formatting rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenColor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
    #[serde(default)]
    pub settings: TokenSettings,
}

/// A loaded theme module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, alias = "ui_theme", skip_serializing_if = "Option::is_none")]
    pub ui_theme: Option<String>,

    /// Workbench colors; `null` unsets a color
    #[serde(default)]
    pub colors: Map<String, Value>,

    #[serde(default, alias = "token_colors")]
    pub token_colors: Vec<TokenColor>,

    /// Everything else, serialized as-is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ThemeDefinition {
    /// Read, parse and normalize a theme module from disk.
    pub fn load(path: &Path) -> Result<Self, ThemeError> {
        if !path.exists() {
            return Err(ThemeError::Missing(path.to_path_buf()));
        }

        let content =
            fs::read_to_string(path).map_err(|err| ThemeError::Io(path.to_path_buf(), err))?;

        let mut theme: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)
                .map_err(|err| ThemeError::Json(path.to_path_buf(), err))?,
            Some("toml") => {
                toml::from_str(&content).map_err(|err| ThemeError::Toml(path.to_path_buf(), err))?
            }
            _ => return Err(ThemeError::UnsupportedFormat(path.to_path_buf())),
        };

        theme.normalize_colors()?;
        Ok(theme)
    }

    /// Rewrite every color to `#RRGGBB[AA]`.
    pub fn normalize_colors(&mut self) -> Result<(), ThemeError> {
        for (key, value) in &mut self.colors {
            match value {
                Value::Null => {}
                Value::String(raw) => *raw = normalize_field(key, raw)?,
                _ => {
                    return Err(ThemeError::Color {
                        key: key.clone(),
                        source: ColorError::Unrecognized(value.to_string()),
                    });
                }
            }
        }

        for (index, rule) in self.token_colors.iter_mut().enumerate() {
            let settings = &mut rule.settings;
            for (field, slot) in [
                ("foreground", &mut settings.foreground),
                ("background", &mut settings.background),
            ] {
                if let Some(raw) = slot {
                    *raw = normalize_field(&format!("tokenColors[{index}].settings.{field}"), raw)?;
                }
            }
        }

        Ok(())
    }
}

fn normalize_field(key: &str, raw: &str) -> Result<String, ThemeError> {
    color::normalize(raw).map_err(|source| ThemeError::Color {
        key: key.to_string(),
        source,
    })
}
