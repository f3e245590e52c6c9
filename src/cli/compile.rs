//! `vsct compile`

use anyhow::Result;

use crate::compiler::{ModuleCache, compile_extension};
use crate::config::ProjectConfig;
use crate::package::PackageMetadata;

pub fn compile_once(config: &ProjectConfig, package: &PackageMetadata) -> Result<()> {
    let cache = ModuleCache::new();
    compile_extension(config, package, &cache, false)?;
    Ok(())
}
