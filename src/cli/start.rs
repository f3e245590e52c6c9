//! `vsct start`: the watch session.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::Notify;

use crate::config::ProjectConfig;
use crate::orchestrator::{self, StartArgs, StartOptions};
use crate::package::PackageMetadata;

/// Watch and rebuild until Ctrl+C.
pub fn start_session(args: StartArgs, config: ProjectConfig, package: PackageMetadata) -> Result<()> {
    let shutdown = Arc::new(Notify::new());
    let handler = Arc::clone(&shutdown);
    ctrlc::set_handler(move || handler.notify_one())
        .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?;

    let root = config.get_root().to_path_buf();
    let options = StartOptions {
        args,
        config,
        root,
        package,
    };
    let report = runtime.block_on(orchestrator::start(options, async move {
        shutdown.notified().await;
        crate::log!("start"; "shutting down...");
    }))?;

    crate::debug!(
        "start"; "{} rebuild(s), {} trigger(s) dropped",
        report.accepted,
        report.dropped
    );
    Ok(())
}
