//! Host package metadata (`package.json`).
//!
//! The extension manifest borrows most of its fields from the package that
//! hosts the theme sources. The file is located by walking upward from the
//! project root.

mod naming;

pub use naming::{
    PackageName, author, display_name, extension_name, link_name, parse_package_name,
    to_directory_name,
};

use crate::config::find_upward;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Package metadata file name.
pub const PACKAGE_FILE: &str = "package.json";

/// Errors raised while reading package metadata or deriving names from it.
#[derive(Debug, Error)]
pub enum PackageError {
    #[error("no `{PACKAGE_FILE}` found in `{0}` or any parent directory")]
    NotFound(PathBuf),

    #[error("failed to read `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to parse `{0}`")]
    Json(PathBuf, #[source] serde_json::Error),

    #[error("invalid package name `{0}`")]
    InvalidName(String),

    #[error("unable to determine the extension name: set `name` in vsct.toml or package.json")]
    MissingName,

    #[error("unable to determine the extension author: set `author` in package.json or use a scoped package name")]
    MissingAuthor,
}

/// `author` may be a plain `"Name <email> (url)"` string or an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Author {
    Text(String),
    Person {
        #[serde(default)]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        email: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
}

impl Author {
    /// Person name, without any email or url decoration.
    pub fn name(&self) -> Option<&str> {
        let name = match self {
            Self::Text(text) => text
                .split(['<', '('])
                .next()
                .unwrap_or_default()
                .trim(),
            Self::Person { name, .. } => name.as_deref().unwrap_or_default().trim(),
        };
        (!name.is_empty()).then_some(name)
    }
}

/// `engines` section; only the editor engine range is of interest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engines {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vscode: Option<String>,
}

/// The fields of `package.json` the compiler reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageJson {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub repository: Option<serde_json::Value>,
    #[serde(default)]
    pub categories: Option<Vec<String>>,
    #[serde(default)]
    pub engines: Option<Engines>,
}

/// Parsed `package.json` together with where it was found.
#[derive(Debug, Clone, Default)]
pub struct PackageMetadata {
    /// Absolute path of the `package.json` file
    pub path: PathBuf,
    pub json: PackageJson,
}

impl PackageMetadata {
    /// Find and parse the nearest `package.json` at or above `start`.
    pub fn discover(start: &Path) -> Result<Self, PackageError> {
        let path = find_upward(start, |dir| {
            let candidate = dir.join(PACKAGE_FILE);
            candidate.is_file().then_some(candidate)
        })
        .ok_or_else(|| PackageError::NotFound(start.to_path_buf()))?;

        Self::from_path(&path)
    }

    /// Parse a specific `package.json`.
    pub fn from_path(path: &Path) -> Result<Self, PackageError> {
        let content =
            fs::read_to_string(path).map_err(|err| PackageError::Io(path.to_path_buf(), err))?;
        let json = serde_json::from_str(&content)
            .map_err(|err| PackageError::Json(path.to_path_buf(), err))?;

        crate::debug!("package"; "loaded {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            json,
        })
    }

    /// Build metadata directly from parsed JSON (no backing file).
    pub fn from_json(json: PackageJson) -> Self {
        Self {
            path: PathBuf::new(),
            json,
        }
    }
}

// ============================================================================
// tests
// ============================================================================
