//! Directory watcher for theme sources.
//!
//! Bridges `notify` into the async session:
//!
//! ```text
//! notify callback → std channel → bridge thread → tokio channel → WatchEvent
//! ```
//!
//! Files that exist when watching starts produce no events. Directories that
//! do not exist yet are re-checked on a maintenance tick; once one appears it
//! is attached and every file already inside it is reported as added.

mod roots;
mod types;


use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use notify::RecommendedWatcher;
use rustc_hash::FxHashSet;
use tokio::sync::mpsc;

use roots::{WatchRoots, files_under};
pub use types::WatchEvent;
use types::ChangeKind;

/// How often missing roots are re-checked.
pub const MAINTENANCE_INTERVAL: Duration = Duration::from_millis(250);

// ============================================================================
// WatchSet
// ============================================================================

/// Deduplicated absolute directories to watch, fixed for a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchSet {
    dirs: Vec<PathBuf>,
    ignored: Vec<PathBuf>,
}

impl WatchSet {
    /// Parent directories of the given source files.
    ///
    /// Order follows first appearance; a directory nested inside another
    /// entry is folded into it since every root is watched recursively.
    pub fn from_sources<I, P>(sources: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut seen = FxHashSet::default();
        let mut dirs: Vec<PathBuf> = Vec::new();
        for source in sources {
            if let Some(parent) = source.as_ref().parent()
                && seen.insert(parent.to_path_buf())
            {
                dirs.push(parent.to_path_buf());
            }
        }

        let nested: Vec<bool> = dirs
            .iter()
            .map(|dir| dirs.iter().any(|other| other != dir && dir.starts_with(other)))
            .collect();
        let dirs = dirs
            .into_iter()
            .zip(nested)
            .filter_map(|(dir, nested)| (!nested).then_some(dir))
            .collect();

        Self {
            dirs,
            ignored: Vec::new(),
        }
    }

    /// Never report events under `path` (e.g. the compile output).
    pub fn ignoring(mut self, path: impl Into<PathBuf>) -> Self {
        self.ignored.push(path.into());
        self
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        self.ignored.iter().any(|ignored| path.starts_with(ignored))
    }
}

// ============================================================================
// DirectoryWatcher
// ============================================================================

/// Observes a [`WatchSet`] and emits [`WatchEvent`]s. Never touches the
/// filesystem beyond reading it.
pub struct DirectoryWatcher {
    /// Channel to receive notify events (sync -> async bridge)
    notify_rx: std::sync::mpsc::Receiver<notify::Result<notify::Event>>,
    /// Watcher handle (must be kept alive)
    watcher: RecommendedWatcher,
    roots: WatchRoots,
    set: WatchSet,
    maintenance: Duration,
}

impl DirectoryWatcher {
    /// Start watching every existing directory of `set` immediately.
    pub fn new(set: &WatchSet) -> notify::Result<Self> {
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })?;

        let mut roots = WatchRoots::new(set.dirs().to_vec());
        for missing in roots.attach_existing(&mut watcher)? {
            crate::debug!("watch"; "{} does not exist yet; will attach when created", missing.display());
        }

        Ok(Self {
            notify_rx,
            watcher,
            roots,
            set: set.clone(),
            maintenance: MAINTENANCE_INTERVAL,
        })
    }

    /// Override the maintenance tick.
    pub fn with_maintenance(mut self, interval: Duration) -> Self {
        self.maintenance = interval;
        self
    }

    /// Emit `Ready`, then events until `tx` is closed.
    pub async fn run(self, tx: mpsc::Sender<WatchEvent>) {
        let Self {
            notify_rx,
            mut watcher,
            mut roots,
            set,
            maintenance,
        } = self;

        let (async_tx, mut async_rx) = mpsc::channel::<notify::Event>(64);

        // Ends once the watcher (and with it the notify sender) is dropped.
        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(event) => {
                        if async_tx.blocking_send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => crate::warn!("watch"; "notify error: {}", e),
                }
            }
        });

        if tx.send(WatchEvent::Ready).await.is_err() {
            return;
        }

        let mut ticker = tokio::time::interval(maintenance);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            let batch = tokio::select! {
                biased;
                () = tx.closed() => break,
                event = async_rx.recv() => match event {
                    Some(event) => translate(&event, &set),
                    None => break,
                },
                _ = ticker.tick() => roots
                    .maintain(&mut watcher)
                    .iter()
                    .flat_map(|root| files_under(root))
                    .filter(|path| !set.is_ignored(path))
                    .map(WatchEvent::Added)
                    .collect(),
            };

            for event in batch {
                if let Some(path) = event.path() {
                    crate::trace!("watch"; "{}: {}", event.label(), path.display());
                }
                if tx.send(event).await.is_err() {
                    return;
                }
            }
        }
    }
}

/// Turn one raw notify event into watch events for regular files.
fn translate(event: &notify::Event, set: &WatchSet) -> Vec<WatchEvent> {
    let Some(kind) = ChangeKind::from_event_kind(&event.kind) else {
        return Vec::new();
    };

    event
        .paths
        .iter()
        .filter(|path| path.is_file() && !set.is_ignored(path))
        .map(|path| kind.into_event(path.clone()))
        .collect()
}
