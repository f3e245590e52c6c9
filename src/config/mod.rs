//! Project configuration management for `vsct.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── error.rs   # ConfigError, ConfigDiagnostics
//! ├── util.rs    # Upward config search, tilde expansion, path normalization
//! └── mod.rs     # ProjectConfig (this file)
//! ```
//!
//! # Layout
//!
//! ```toml
//! out_dir = "themes"
//! extensions_dir = "~/.vscode/extensions"
//!
//! [[themes]]
//! label = "Midnight"
//! path = "src/midnight.json"
//! ui_theme = "vs-dark"
//!
//! [watch]
//! min_interval = 500
//! settle = 500
//! poll = 50
//! ```

mod error;
mod util;

pub use error::{ConfigDiagnostic, ConfigDiagnostics, ConfigError};
pub use util::{expand_tilde, find_config_file, find_upward, normalize_path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Component, Path, PathBuf},
    time::Duration,
};

/// Default config file name.
pub const CONFIG_FILE: &str = "vsct.toml";

/// Environment variable overriding `extensions_dir`.
pub const EXTENSIONS_DIR_ENV: &str = "VSCT_EXTENSIONS_DIR";

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing vsct.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Extension name override (defaults to the unscoped package name)
    #[serde(default)]
    pub name: Option<String>,

    /// Extension display name override
    #[serde(default, alias = "displayName")]
    pub display_name: Option<String>,

    /// Compiled package directory, relative to the root
    #[serde(default = "default_out_dir", alias = "outDir")]
    pub out_dir: PathBuf,

    /// Editor extensions directory the package is linked into
    #[serde(default = "default_extensions_dir", alias = "extensionsDir")]
    pub extensions_dir: PathBuf,

    /// Themes to compile, in manifest order
    #[serde(default)]
    pub themes: Vec<ThemeDescriptor>,

    /// Watch session tuning
    #[serde(default)]
    pub watch: WatchConfig,
}

/// One `[[themes]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeDescriptor {
    /// Display label contributed to the editor
    #[serde(default)]
    pub label: String,

    /// Theme source module, relative to the root
    #[serde(alias = "main")]
    pub path: PathBuf,

    /// Base UI theme (`vs`, `vs-dark`, `hc-black`, `hc-light`)
    #[serde(default, alias = "uiTheme")]
    pub ui_theme: Option<String>,
}

/// `[watch]` section, all values in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Minimum spacing between rebuild starts
    #[serde(alias = "minInterval")]
    pub min_interval: u64,
    /// Quiet period after the last added file before the first rebuild
    pub settle: u64,
    /// Polling interval of the readiness check
    pub poll: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            min_interval: 500,
            settle: 500,
            poll: 50,
        }
    }
}

impl WatchConfig {
    pub const fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval)
    }

    pub const fn settle(&self) -> Duration {
        Duration::from_millis(self.settle)
    }

    pub const fn poll(&self) -> Duration {
        Duration::from_millis(self.poll)
    }
}

fn default_out_dir() -> PathBuf {
    PathBuf::from("themes")
}

fn default_extensions_dir() -> PathBuf {
    PathBuf::from("~/.vscode/extensions")
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            root: PathBuf::new(),
            name: None,
            display_name: None,
            out_dir: default_out_dir(),
            extensions_dir: default_extensions_dir(),
            themes: Vec::new(),
            watch: WatchConfig::default(),
        }
    }
}

impl ProjectConfig {
    /// Locate the config file upward from `cwd` and load it.
    pub fn discover(cwd: &Path, config_name: &Path) -> Result<Self> {
        let config_path = find_config_file(cwd, config_name)
            .ok_or_else(|| ConfigError::NotFound(config_name.to_path_buf()))?;
        Self::load(&config_path)
    }

    /// Load, normalize and validate configuration from a file.
    ///
    /// The project root is the config file's parent directory.
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_path = config_path
            .canonicalize()
            .map_err(|err| ConfigError::Io(config_path.to_path_buf(), err))?;
        let content = fs::read_to_string(&config_path)
            .map_err(|err| ConfigError::Io(config_path.clone(), err))?;

        let (mut config, ignored) = Self::parse_with_ignored(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, &config_path);
        }

        if let Ok(dir) = std::env::var(EXTENSIONS_DIR_ENV)
            && !dir.is_empty()
        {
            config.extensions_dir = PathBuf::from(dir);
        }

        let root = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        config.config_path = config_path;
        config.finalize(&root);
        config.validate().map_err(ConfigError::Diagnostics)?;

        Ok(config)
    }

    /// Parse configuration from a TOML string (no validation).
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Toml)?;
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::Toml)?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        crate::warn!("config"; "unknown fields in {} will be ignored:", display_path);
        for field in fields {
            crate::warn!("config"; "- {}", field);
        }
    }

    /// Anchor relative paths at `root` and expand `~`.
    ///
    /// Configured theme and output paths stay as written so validation can
    /// inspect them; [`Self::root_join`] resolves them on use.
    pub fn finalize(&mut self, root: &Path) {
        self.root = normalize_path(root);

        let extensions_dir = expand_tilde(&self.extensions_dir);
        self.extensions_dir = self.root_join(extensions_dir);
    }

    /// Check the loaded configuration, collecting every problem.
    pub fn validate(&self) -> Result<(), ConfigDiagnostics> {
        let mut diag = ConfigDiagnostics::new();

        if self.themes.is_empty() {
            diag.error_with_hint(
                "themes",
                "configuration does not define any themes",
                "add a [[themes]] entry with `label` and `path`",
            );
        }

        for (index, theme) in self.themes.iter().enumerate() {
            if theme.path.as_os_str().is_empty() {
                diag.error(format!("themes[{index}].path"), "theme path must not be empty");
            }
        }

        if self.out_dir.as_os_str().is_empty() {
            diag.error("out_dir", "output directory must not be empty");
        } else {
            self.validate_out_dir(&mut diag);
        }

        for (field, value) in [
            ("watch.min_interval", self.watch.min_interval),
            ("watch.poll", self.watch.poll),
        ] {
            if value == 0 {
                diag.error(field, "must be greater than zero");
            }
        }

        diag.into_result()
    }

    /// The output directory is wiped on every compile, so it must not hold
    /// the project or any theme source.
    fn validate_out_dir(&self, diag: &mut ConfigDiagnostics) {
        if self.out_dir.components().any(|c| matches!(c, Component::ParentDir)) {
            diag.error_with_hint(
                "out_dir",
                format!("path '{}': parent directory '..' not allowed", self.out_dir.display()),
                "use a subdirectory of the project, e.g. `themes`",
            );
            return;
        }

        let root = normalize_path(&self.root);
        let out = self.out_dir();
        if root.starts_with(&out) {
            diag.error("out_dir", format!("'{}' contains the project root", self.out_dir.display()));
            return;
        }

        for (index, theme) in self.themes.iter().enumerate() {
            if theme.path.as_os_str().is_empty() {
                continue;
            }
            let source = self.root_join(&theme.path);
            let Some(source_dir) = source.parent() else {
                continue;
            };

            if source_dir.starts_with(&out) {
                diag.error(
                    "out_dir",
                    format!(
                        "'{}' contains the source of themes[{index}] ({})",
                        self.out_dir.display(),
                        theme.path.display()
                    ),
                );
            } else if out.starts_with(source_dir) && !root.starts_with(source_dir) {
                // A theme at the project root shares its directory with the output.
                diag.error(
                    "out_dir",
                    format!(
                        "'{}' lies inside the source directory of themes[{index}] ({})",
                        self.out_dir.display(),
                        theme.path.display()
                    ),
                );
            }
        }
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        &self.root
    }

    /// Join a path with the root directory, resolving `.` and `..`.
    pub fn root_join(&self, path: impl AsRef<Path>) -> PathBuf {
        normalize_path(&self.root.join(path))
    }

    /// Absolute compiled package directory.
    pub fn out_dir(&self) -> PathBuf {
        self.root_join(&self.out_dir)
    }

    /// Absolute theme source module paths, in descriptor order.
    pub fn theme_sources(&self) -> Vec<PathBuf> {
        self.themes
            .iter()
            .map(|theme| self.root_join(&theme.path))
            .collect()
    }
}

// ============================================================================
// tests
// ============================================================================
