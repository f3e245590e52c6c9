use std::cell::RefCell;
use std::fs;
use std::future::{Future, pending};
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::task::{LocalSet, spawn_local};
use tokio::time::{Instant, sleep, sleep_until};

use super::driver::{DriverState, Pipeline};
use super::outcome::{BuildOutcome, FailureClass};
use super::readiness::ReadinessGate;
use super::scheduler::RebuildRequest;
use super::*;
use crate::config::WatchConfig;
use crate::install::InstallError;
use crate::watch::WatchEvent;

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

fn context() -> BuildContext {
    BuildContext::new(
        Arc::new(ProjectConfig::default()),
        Arc::new(PackageMetadata::default()),
    )
    .quiet(true)
}

fn watch_config() -> WatchConfig {
    WatchConfig {
        min_interval: 500,
        settle: 500,
        poll: 50,
    }
}

fn changed() -> WatchEvent {
    WatchEvent::Changed(PathBuf::from("/p/src/dark.json"))
}

fn added(name: &str) -> WatchEvent {
    WatchEvent::Added(PathBuf::from("/p/src").join(name))
}

// ============================================================================
// Fakes
// ============================================================================

/// Records start offsets and fails on selected calls.
#[derive(Clone)]
struct FakeCompiler {
    origin: Instant,
    duration: Duration,
    starts: Rc<RefCell<Vec<Duration>>>,
    finished: Rc<RefCell<usize>>,
    fail_calls: Vec<usize>,
}

impl FakeCompiler {
    fn new(origin: Instant, duration: Duration) -> Self {
        Self {
            origin,
            duration,
            starts: Rc::default(),
            finished: Rc::default(),
            fail_calls: Vec::new(),
        }
    }

    fn failing_on(mut self, call: usize) -> Self {
        self.fail_calls.push(call);
        self
    }

    fn starts(&self) -> Vec<Duration> {
        self.starts.borrow().clone()
    }
}

impl Compiler for FakeCompiler {
    fn compile(&self, _ctx: &BuildContext) -> impl Future<Output = Result<()>> {
        let call = {
            let mut starts = self.starts.borrow_mut();
            starts.push(self.origin.elapsed());
            starts.len() - 1
        };
        let fail = self.fail_calls.contains(&call);
        let duration = self.duration;
        let finished = Rc::clone(&self.finished);

        async move {
            sleep(duration).await;
            *finished.borrow_mut() += 1;
            if fail {
                return Err(anyhow!("theme `dark.json`: invalid color `#zz`"));
            }
            Ok(())
        }
    }
}

#[derive(Clone, Default)]
struct FakeInstaller {
    silent_flags: Rc<RefCell<Vec<bool>>>,
    link_conflict: bool,
}

impl Installer for FakeInstaller {
    fn install(&self, _ctx: &BuildContext, silent: bool) -> impl Future<Output = Result<()>> {
        self.silent_flags.borrow_mut().push(silent);
        let conflict = self.link_conflict;
        async move {
            if conflict {
                let conflict = InstallError::LinkExists(PathBuf::from("/ext/acme.midnight"));
                return Err(anyhow::Error::from(conflict));
            }
            Ok(())
        }
    }
}

/// Panics on its first call, succeeds afterwards.
#[derive(Clone, Default)]
struct PanickingCompiler {
    calls: Rc<RefCell<usize>>,
}

impl Compiler for PanickingCompiler {
    fn compile(&self, _ctx: &BuildContext) -> impl Future<Output = Result<()>> {
        let call = {
            let mut calls = self.calls.borrow_mut();
            *calls += 1;
            *calls
        };
        async move {
            if call == 1 {
                panic!("theme module evaluation blew up");
            }
            Ok(())
        }
    }
}

/// Compiler that reads one module through the shared cache.
struct CachedCompiler {
    cache: Arc<ModuleCache>,
    module: PathBuf,
    labels: Rc<RefCell<Vec<String>>>,
}

impl Compiler for CachedCompiler {
    fn compile(&self, _ctx: &BuildContext) -> impl Future<Output = Result<()>> {
        let result = self.cache.load(&self.module).map(|theme| {
            let label = theme.label.clone().unwrap_or_default();
            self.labels.borrow_mut().push(label);
        });
        async move { result.map_err(anyhow::Error::from) }
    }
}

// ============================================================================
// Harness
// ============================================================================

/// Feed `script` (offset, event) into a session, close the stream at `end`.
async fn drive<C, I>(
    orchestrator: Orchestrator<C, I>,
    origin: Instant,
    script: Vec<(u64, WatchEvent)>,
    end: u64,
) -> SessionReport
where
    C: Compiler + 'static,
    I: Installer + 'static,
{
    let (tx, rx) = mpsc::channel(64);
    LocalSet::new()
        .run_until(async move {
            let feeder = spawn_local(async move {
                for (at, event) in script {
                    sleep_until(origin + ms(at)).await;
                    tx.send(event).await.unwrap();
                }
                sleep_until(origin + ms(end)).await;
            });
            let report = orchestrator.run(rx, pending()).await;
            feeder.await.unwrap();
            report
        })
        .await
}

fn orchestrator<C: Compiler + 'static, I: Installer + 'static>(
    compiler: C,
    installer: I,
) -> Orchestrator<C, I> {
    Orchestrator::new(
        compiler,
        installer,
        context(),
        Arc::new(ModuleCache::new()),
        &watch_config(),
    )
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_triggers_during_build_are_dropped() {
    let origin = Instant::now();
    let compiler = FakeCompiler::new(origin, ms(1000));
    let installer = FakeInstaller::default();

    let script = vec![
        (0, WatchEvent::Ready),
        (600, changed()),
        (700, changed()),
        (800, changed()),
        (1600, changed()),
    ];
    let report = drive(
        orchestrator(compiler.clone(), installer.clone()),
        origin,
        script,
        3000,
    )
    .await;

    assert_eq!(report.accepted, 2);
    assert_eq!(report.dropped, 3);
    assert_eq!(report.failures(), 0);

    let starts = compiler.starts();
    assert_eq!(starts.len(), 2);
    // First build waits for the gate armed by `Ready`.
    assert!(starts[0] >= ms(500) && starts[0] < ms(560), "{starts:?}");
    assert!(starts[1] >= ms(1600) && starts[1] < ms(1610), "{starts:?}");
    assert_eq!(*installer.silent_flags.borrow(), vec![true, true]);
}

#[tokio::test(start_paused = true)]
async fn test_min_interval_drops_fast_triggers() {
    let origin = Instant::now();
    let compiler = FakeCompiler::new(origin, ms(10));

    // A change every 100ms after the first build.
    let mut script = vec![(0, WatchEvent::Ready)];
    script.extend((6..30).map(|i| (i * 100, changed())));
    let report = drive(
        orchestrator(compiler.clone(), FakeInstaller::default()),
        origin,
        script,
        3200,
    )
    .await;

    let starts = compiler.starts();
    assert_eq!(report.accepted, starts.len());
    assert!(starts.len() >= 5, "{starts:?}");
    // The first rebuild was accepted at 0 and spent its head start waiting
    // for the gate, so spacing is measured from the second one on.
    for pair in starts[1..].windows(2) {
        assert!(pair[1] - pair[0] >= ms(500), "{starts:?}");
    }
    assert_eq!(report.accepted + report.dropped, 25);
}

#[tokio::test(start_paused = true)]
async fn test_first_build_waits_for_add_burst() {
    let origin = Instant::now();
    let compiler = FakeCompiler::new(origin, ms(10));

    let script = vec![
        (0, WatchEvent::Ready),
        (100, added("a.json")),
        (200, added("b.json")),
        (300, added("c.json")),
    ];
    let report = drive(
        orchestrator(compiler.clone(), FakeInstaller::default()),
        origin,
        script,
        2000,
    )
    .await;

    assert_eq!(report.accepted, 1);
    assert_eq!(report.dropped, 3);
    let starts = compiler.starts();
    assert!(starts[0] >= ms(800) && starts[0] <= ms(850), "{starts:?}");
}

#[tokio::test(start_paused = true)]
async fn test_gate_only_delays_first_build() {
    let origin = Instant::now();
    let compiler = FakeCompiler::new(origin, ms(10));

    let script = vec![(0, WatchEvent::Ready), (1000, added("late.json"))];
    drive(
        orchestrator(compiler.clone(), FakeInstaller::default()),
        origin,
        script,
        2000,
    )
    .await;

    let starts = compiler.starts();
    assert_eq!(starts.len(), 2);
    assert!(starts[1] >= ms(1000) && starts[1] < ms(1010), "{starts:?}");
}

#[tokio::test(start_paused = true)]
async fn test_failed_build_does_not_stop_session() {
    let origin = Instant::now();
    let compiler = FakeCompiler::new(origin, ms(10)).failing_on(1);
    let installer = FakeInstaller::default();

    let script = vec![(0, WatchEvent::Ready), (1000, changed()), (2000, changed())];
    let report = drive(
        orchestrator(compiler.clone(), installer.clone()),
        origin,
        script,
        3000,
    )
    .await;

    assert_eq!(
        report.outcomes,
        vec![
            BuildOutcome::Success,
            BuildOutcome::Failed(FailureClass::Reportable),
            BuildOutcome::Success,
        ]
    );
    // The failed compile skipped its install.
    assert_eq!(installer.silent_flags.borrow().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_panicked_rebuild_is_counted_apart() {
    let origin = Instant::now();
    let compiler = PanickingCompiler::default();

    let script = vec![(0, WatchEvent::Ready), (1000, changed())];
    let report = drive(
        orchestrator(compiler.clone(), FakeInstaller::default()),
        origin,
        script,
        2000,
    )
    .await;

    assert_eq!(report.panicked, 1);
    assert_eq!(report.accepted, 1);
    assert_eq!(report.outcomes, vec![BuildOutcome::Success]);
    assert_eq!(report.failures(), 1);
    // The panicking task released the scheduler for the next change.
    assert_eq!(*compiler.calls.borrow(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_link_conflict_is_benign() {
    let origin = Instant::now();
    let installer = FakeInstaller {
        link_conflict: true,
        ..FakeInstaller::default()
    };

    let script = vec![(0, WatchEvent::Ready), (1000, changed())];
    let report = drive(
        orchestrator(FakeCompiler::new(origin, ms(10)), installer),
        origin,
        script,
        2000,
    )
    .await;

    assert_eq!(
        report.outcomes,
        vec![BuildOutcome::Failed(FailureClass::Benign); 2]
    );
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_waits_for_running_build() {
    let origin = Instant::now();
    let compiler = FakeCompiler::new(origin, ms(1000));
    let (tx, rx) = mpsc::channel(8);
    tx.send(WatchEvent::Ready).await.unwrap();

    let orchestrator = orchestrator(compiler.clone(), FakeInstaller::default());
    let report = LocalSet::new()
        .run_until(orchestrator.run(rx, sleep(ms(600))))
        .await;

    // Build started at 500 and was not cut short at 600.
    assert!(origin.elapsed() >= ms(1500));
    assert_eq!(*compiler.finished.borrow(), 1);
    assert_eq!(report.outcomes, vec![BuildOutcome::Success]);
    drop(tx);
}

#[tokio::test(start_paused = true)]
async fn test_rebuild_sees_current_module_content() {
    let temp = TempDir::new().unwrap();
    let module = temp.path().join("dark.json");
    fs::write(&module, r#"{ "label": "One" }"#).unwrap();

    let cache = Arc::new(ModuleCache::new());
    let labels = Rc::new(RefCell::new(Vec::new()));
    let compiler = CachedCompiler {
        cache: Arc::clone(&cache),
        module: module.clone(),
        labels: Rc::clone(&labels),
    };
    let orchestrator = Orchestrator::new(
        compiler,
        FakeInstaller::default(),
        context(),
        Arc::clone(&cache),
        &watch_config(),
    );

    let origin = Instant::now();
    let (tx, rx) = mpsc::channel(8);
    let report = LocalSet::new()
        .run_until(async move {
            let feeder = spawn_local(async move {
                tx.send(WatchEvent::Ready).await.unwrap();
                sleep_until(origin + ms(1000)).await;
                fs::write(&module, r#"{ "label": "Two" }"#).unwrap();
                tx.send(WatchEvent::Changed(module)).await.unwrap();
                sleep_until(origin + ms(2000)).await;
            });
            let report = orchestrator.run(rx, pending()).await;
            feeder.await.unwrap();
            report
        })
        .await;

    assert_eq!(report.accepted, 2);
    assert_eq!(*labels.borrow(), vec!["One".to_string(), "Two".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_pipeline_states() {
    let origin = Instant::now();
    let gate = Arc::new(ReadinessGate::new(ms(500), ms(50)));
    gate.arm();
    let pipeline = Rc::new(Pipeline::new(
        FakeCompiler::new(origin, ms(1000)),
        FakeInstaller::default(),
        context(),
        Arc::new(ModuleCache::new()),
        Arc::clone(&gate),
    ));
    assert_eq!(pipeline.state(), DriverState::Idle);

    LocalSet::new()
        .run_until(async {
            let first = spawn_local(Rc::clone(&pipeline).rebuild(RebuildRequest::new(WatchEvent::Ready)));
            sleep(ms(10)).await;
            assert_eq!(pipeline.state(), DriverState::AwaitingReadiness);
            sleep_until(origin + ms(600)).await;
            assert_eq!(pipeline.state(), DriverState::Building);
            assert_eq!(first.await.unwrap(), BuildOutcome::Success);
            assert_eq!(pipeline.state(), DriverState::Idle);

            // Gate stays open: the next rebuild goes straight to building.
            let second = spawn_local(Rc::clone(&pipeline).rebuild(RebuildRequest::new(changed())));
            sleep(ms(1)).await;
            assert_eq!(pipeline.state(), DriverState::Building);
            second.await.unwrap();
        })
        .await;
}
