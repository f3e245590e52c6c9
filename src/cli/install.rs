//! `vsct install`

use anyhow::Result;

use crate::config::ProjectConfig;
use crate::install::{InstallOutcome, install};
use crate::package::PackageMetadata;

pub fn install_once(config: &ProjectConfig, package: &PackageMetadata, silent: bool) -> Result<()> {
    let outcome = install(config, package, silent)?;
    if outcome == InstallOutcome::Relinked {
        crate::debug!("install"; "replaced a link to another directory");
    }
    Ok(())
}
