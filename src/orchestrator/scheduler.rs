//! Rebuild scheduler with overflow-drop backpressure.
//!
//! A request either starts a rebuild right now or is discarded:
//!
//! - at most [`MAX_CONCURRENT`] rebuild runs at a time
//! - nothing waits behind it
//! - consecutive starts are spaced by at least `min_interval`
//!
//! A dropped request loses nothing: whichever rebuild runs next re-reads the
//! current sources.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::watch::WatchEvent;

/// Rebuilds allowed to execute at once.
pub const MAX_CONCURRENT: usize = 1;

/// Default spacing between rebuild starts.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(500);

/// A request to rebuild, stamped at creation.
#[derive(Debug, Clone)]
pub struct RebuildRequest {
    pub trigger: WatchEvent,
    requested_at: Instant,
}

impl RebuildRequest {
    pub fn new(trigger: WatchEvent) -> Self {
        Self {
            trigger,
            requested_at: Instant::now(),
        }
    }

    /// Creation time. Would only break ties between queued requests, and
    /// nothing is ever queued, so it is logged and otherwise ignored.
    pub fn priority(&self) -> Instant {
        self.requested_at
    }
}

/// Result of [`BuildScheduler::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission<T> {
    /// The build ran to completion and produced `T`
    Completed(T),
    /// Rejected without running
    Dropped,
}

impl<T> Submission<T> {
    pub fn is_dropped(&self) -> bool {
        matches!(self, Self::Dropped)
    }
}

/// Why a request was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// [`MAX_CONCURRENT`] rebuilds are already running
    Busy,
    /// The previous start was less than `min_interval` ago
    TooSoon { wait: Duration },
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Busy => f.write_str("rebuild in progress"),
            Self::TooSoon { wait } => write!(f, "next start allowed in {}ms", wait.as_millis()),
        }
    }
}

#[derive(Debug, Default)]
struct SchedulerState {
    running: usize,
    last_started_at: Option<Instant>,
}

#[derive(Debug)]
pub struct BuildScheduler {
    min_interval: Duration,
    state: Mutex<SchedulerState>,
}

impl BuildScheduler {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            state: Mutex::new(SchedulerState::default()),
        }
    }

    /// Accept a rebuild start if a slot is free and the spacing has elapsed.
    ///
    /// On success the scheduler counts the rebuild as running; the caller
    /// must follow up with [`on_complete`](Self::on_complete).
    pub fn accept(&self) -> Result<(), Rejection> {
        let mut state = self.state.lock();
        if state.running >= MAX_CONCURRENT {
            return Err(Rejection::Busy);
        }

        let now = Instant::now();
        if let Some(last) = state.last_started_at {
            let since = now.duration_since(last);
            if since < self.min_interval {
                return Err(Rejection::TooSoon {
                    wait: self.min_interval - since,
                });
            }
        }

        state.running += 1;
        state.last_started_at = Some(now);
        Ok(())
    }

    pub fn try_accept(&self) -> bool {
        self.accept().is_ok()
    }

    /// Mark a running rebuild finished, whatever its result.
    pub fn on_complete(&self) {
        let mut state = self.state.lock();
        state.running = state.running.saturating_sub(1);
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().running > 0
    }

    /// [`accept`](Self::accept) returning a guard that completes the rebuild
    /// when dropped, including on panic.
    pub fn try_acquire(self: &Arc<Self>) -> Result<BuildPermit, Rejection> {
        self.accept()?;
        Ok(BuildPermit {
            scheduler: Arc::clone(self),
        })
    }

    /// Run `build` if accepted, otherwise drop the request immediately.
    pub async fn submit<F, Fut>(self: &Arc<Self>, request: RebuildRequest, build: F) -> Submission<Fut::Output>
    where
        F: FnOnce(RebuildRequest) -> Fut,
        Fut: Future,
    {
        let permit = match self.try_acquire() {
            Ok(permit) => permit,
            Err(rejection) => {
                crate::trace!(
                    "start"; "rebuild request dropped ({}, requested {}ms ago): {}",
                    request.trigger.label(),
                    request.priority().elapsed().as_millis(),
                    rejection
                );
                return Submission::Dropped;
            }
        };

        let output = build(request).await;
        drop(permit);
        Submission::Completed(output)
    }
}

/// Running-rebuild guard; dropping it calls [`BuildScheduler::on_complete`].
#[derive(Debug)]
pub struct BuildPermit {
    scheduler: Arc<BuildScheduler>,
}

impl Drop for BuildPermit {
    fn drop(&mut self) {
        self.scheduler.on_complete();
    }
}
