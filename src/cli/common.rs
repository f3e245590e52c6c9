//! Project loading shared by every command.

use anyhow::{Context, Result};

use super::Cli;
use crate::config::ProjectConfig;
use crate::package::PackageMetadata;

/// Load `vsct.toml` and the nearest `package.json` above the project root.
pub fn load_project(cli: &Cli) -> Result<(ProjectConfig, PackageMetadata)> {
    let cwd = std::env::current_dir().context("Failed to read the current directory")?;
    let config = ProjectConfig::discover(&cwd, &cli.config)?;
    crate::debug!("config"; "loaded {}", config.config_path.display());

    let package = PackageMetadata::discover(config.get_root())?;
    Ok((config, package))
}
