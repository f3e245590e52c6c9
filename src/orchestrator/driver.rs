//! Watch-session driver.
//!
//! Turns watcher events into rebuild requests and runs accepted rebuilds:
//!
//! ```text
//! WatchEvent ──► BuildScheduler ──► Pipeline::rebuild
//!                 (drop if busy)     invalidate → gate (once) → compile → install
//! ```
//!
//! Each request runs as a local task so the event loop keeps receiving (and
//! dropping) triggers while a rebuild is in flight.

use std::cell::Cell;
use std::future::Future;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;

use super::outcome::{self, BuildOutcome};
use super::readiness::ReadinessGate;
use super::scheduler::{BuildScheduler, RebuildRequest, Submission};
use super::{BuildContext, Compiler, Installer};
use crate::compiler::ModuleCache;
use crate::config::WatchConfig;
use crate::watch::WatchEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    /// First rebuild only
    AwaitingReadiness,
    Building,
}

/// Counters for a finished session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionReport {
    /// Rebuilds that ran to an outcome
    pub accepted: usize,
    pub dropped: usize,
    /// Rebuild tasks that panicked before producing an outcome
    pub panicked: usize,
    pub outcomes: Vec<BuildOutcome>,
}

impl SessionReport {
    /// Failed outcomes plus panicked tasks.
    pub fn failures(&self) -> usize {
        let failed = self.outcomes.iter().filter(|outcome| !outcome.is_success()).count();
        failed + self.panicked
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// The steps of one accepted rebuild.
pub(super) struct Pipeline<C, I> {
    compiler: C,
    installer: I,
    context: BuildContext,
    cache: Arc<ModuleCache>,
    gate: Arc<ReadinessGate>,
    state: Cell<DriverState>,
}

impl<C: Compiler, I: Installer> Pipeline<C, I> {
    pub(super) fn new(
        compiler: C,
        installer: I,
        context: BuildContext,
        cache: Arc<ModuleCache>,
        gate: Arc<ReadinessGate>,
    ) -> Self {
        Self {
            compiler,
            installer,
            context,
            cache,
            gate,
            state: Cell::new(DriverState::Idle),
        }
    }

    #[cfg(test)]
    pub(super) fn state(&self) -> DriverState {
        self.state.get()
    }

    fn enter(&self, state: DriverState) {
        crate::trace!("start"; "{:?} -> {:?}", self.state.get(), state);
        self.state.set(state);
    }

    /// Run one rebuild to completion. Never fails; errors become outcomes.
    pub(super) async fn rebuild(self: Rc<Self>, request: RebuildRequest) -> BuildOutcome {
        crate::debug!("start"; "rebuilding ({})", request.trigger.label());
        self.cache.invalidate();

        if !self.gate.is_resolved() {
            self.enter(DriverState::AwaitingReadiness);
            self.gate.wait().await;
        }

        self.enter(DriverState::Building);
        let started = Instant::now();
        let result = self.compile_and_install().await;
        let outcome = outcome::report(&result, started.elapsed());
        self.enter(DriverState::Idle);

        outcome
    }

    async fn compile_and_install(&self) -> Result<()> {
        self.compiler.compile(&self.context).await?;
        self.installer.install(&self.context, true).await
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

pub struct Orchestrator<C, I> {
    pipeline: Rc<Pipeline<C, I>>,
    gate: Arc<ReadinessGate>,
    scheduler: Arc<BuildScheduler>,
    watched: Vec<PathBuf>,
    tasks: JoinSet<Submission<BuildOutcome>>,
    report: SessionReport,
}

impl<C, I> Orchestrator<C, I>
where
    C: Compiler + 'static,
    I: Installer + 'static,
{
    pub fn new(
        compiler: C,
        installer: I,
        context: BuildContext,
        cache: Arc<ModuleCache>,
        watch: &WatchConfig,
    ) -> Self {
        let gate = Arc::new(ReadinessGate::new(watch.settle(), watch.poll()));
        let pipeline = Pipeline::new(compiler, installer, context, cache, Arc::clone(&gate));

        Self {
            pipeline: Rc::new(pipeline),
            gate,
            scheduler: Arc::new(BuildScheduler::new(watch.min_interval())),
            watched: Vec::new(),
            tasks: JoinSet::new(),
            report: SessionReport::default(),
        }
    }

    /// Directories announced once the watcher is ready.
    pub fn watching(mut self, dirs: Vec<PathBuf>) -> Self {
        self.watched = dirs;
        self
    }

    /// Process events until `shutdown` completes or the event stream ends,
    /// then wait for the in-flight rebuild.
    ///
    /// Must run inside a [`tokio::task::LocalSet`].
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<WatchEvent>,
        shutdown: impl Future<Output = ()>,
    ) -> SessionReport {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => {
                    crate::debug!("start"; "shutdown requested");
                    break;
                }
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    self.record(joined);
                }
                event = events.recv() => match event {
                    Some(event) => self.handle(event),
                    None => {
                        crate::debug!("start"; "watcher stopped");
                        break;
                    }
                },
            }
        }

        while let Some(joined) = self.tasks.join_next().await {
            self.record(joined);
        }

        self.report
    }

    fn handle(&mut self, event: WatchEvent) {
        match &event {
            WatchEvent::Ready => {
                self.gate.arm();
                for dir in &self.watched {
                    crate::log!("watch"; "watching {}", dir.display());
                }
            }
            WatchEvent::Added(path) => {
                crate::debug!("watch"; "added: {}", path.display());
                self.gate.record_add();
            }
            WatchEvent::Changed(path) => {
                crate::debug!("watch"; "changed: {}", path.display());
            }
        }

        self.submit(RebuildRequest::new(event));
    }

    fn submit(&mut self, request: RebuildRequest) {
        let scheduler = Arc::clone(&self.scheduler);
        let pipeline = Rc::clone(&self.pipeline);
        self.tasks.spawn_local(async move {
            scheduler
                .submit(request, move |request| pipeline.rebuild(request))
                .await
        });
    }

    fn record(&mut self, joined: Result<Submission<BuildOutcome>, JoinError>) {
        match joined {
            Ok(Submission::Completed(outcome)) => {
                self.report.accepted += 1;
                self.report.outcomes.push(outcome);
            }
            Ok(Submission::Dropped) => self.report.dropped += 1,
            Err(err) => {
                crate::error!("start"; "rebuild task failed: {}", err);
                self.report.panicked += 1;
            }
        }
    }
}
