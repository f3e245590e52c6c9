//! Incremental build orchestrator for `vsct start`.
//!
//! Watches the theme source directories and rebuilds on change:
//!
//! - [`scheduler`]: one rebuild at a time, starts spaced by `min_interval`,
//!   excess requests dropped
//! - [`readiness`]: the first rebuild waits for generated sources to settle
//! - [`driver`]: event loop, rebuild steps and failure classification
//!
//! Everything runs on a single-threaded runtime inside a [`LocalSet`]; the
//! real compiler and installer push their filesystem work to the blocking
//! pool and are awaited.

mod driver;
mod outcome;
mod readiness;
mod scheduler;

#[cfg(test)]
mod tests;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::LocalSet;

use crate::compiler::{ModuleCache, ThemeCompiler};
use crate::config::ProjectConfig;
use crate::install::LinkInstaller;
use crate::package::PackageMetadata;
use crate::utils::plural::plural_count;
use crate::watch::{DirectoryWatcher, WatchSet};

pub use driver::{Orchestrator, SessionReport};

/// Capacity of the watcher → driver channel.
const EVENT_BUFFER: usize = 64;

// ============================================================================
// Collaborators
// ============================================================================

/// Everything a rebuild needs, shared across rebuilds.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub config: Arc<ProjectConfig>,
    pub package: Arc<PackageMetadata>,
    /// Demote per-theme progress lines to verbose
    pub quiet: bool,
}

impl BuildContext {
    pub fn new(config: Arc<ProjectConfig>, package: Arc<PackageMetadata>) -> Self {
        Self {
            config,
            package,
            quiet: false,
        }
    }

    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }
}

/// Writes the extension package into the output directory.
pub trait Compiler {
    /// Fails if any theme fails to load or serialize.
    fn compile(&self, ctx: &BuildContext) -> impl Future<Output = Result<()>>;
}

/// Links the output directory into the editor's extensions directory.
pub trait Installer {
    /// `silent` suppresses the "already installed" notice.
    fn install(&self, ctx: &BuildContext, silent: bool) -> impl Future<Output = Result<()>>;
}

// ============================================================================
// Entry point
// ============================================================================

/// Command-line overrides for the `[watch]` section.
#[derive(Debug, Clone, Copy, Default)]
pub struct StartArgs {
    pub min_interval: Option<u64>,
    pub settle: Option<u64>,
}

pub struct StartOptions {
    pub args: StartArgs,
    pub config: ProjectConfig,
    pub root: PathBuf,
    pub package: PackageMetadata,
}

/// Run a watch session until `shutdown` completes.
///
/// Must be called on a current-thread runtime; the session lives on a
/// [`LocalSet`]. Per-rebuild failures never end the session.
pub async fn start(options: StartOptions, shutdown: impl Future<Output = ()>) -> Result<SessionReport> {
    let StartOptions {
        args,
        mut config,
        root,
        package,
    } = options;

    if let Some(min_interval) = args.min_interval {
        config.watch.min_interval = min_interval;
    }
    if let Some(settle) = args.settle {
        config.watch.settle = settle;
    }
    let watch = config.watch;

    let set = WatchSet::from_sources(config.theme_sources()).ignoring(config.out_dir());
    let watcher = DirectoryWatcher::new(&set).context("failed to start the file watcher")?;
    crate::log!("start"; "{} under {}", plural_count(set.len(), "watch root"), root.display());

    let cache = Arc::new(ModuleCache::new());
    let context = BuildContext::new(Arc::new(config), Arc::new(package)).quiet(true);
    let orchestrator = Orchestrator::new(
        ThemeCompiler::new(Arc::clone(&cache)),
        LinkInstaller,
        context,
        cache,
        &watch,
    )
    .watching(set.dirs().to_vec());

    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let session = async move {
        let watcher_task = tokio::task::spawn_local(watcher.run(tx));
        let report = orchestrator.run(rx, shutdown).await;
        watcher_task.abort();
        report
    };
    let report = LocalSet::new().run_until(session).await;

    crate::debug!(
        "start"; "session ended: {} rebuilt, {} dropped, {} failed ({} panicked)",
        report.accepted,
        report.dropped,
        report.failures(),
        report.panicked
    );
    Ok(report)
}
