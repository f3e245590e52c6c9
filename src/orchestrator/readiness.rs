//! One-shot readiness gate for the first rebuild.
//!
//! Sources may still be written by an external generator when the session
//! starts. The gate waits until no file has been added for `settle`, then
//! stays open for the rest of the session.
//!
//! With no adds at all the baseline is the instant the gate was armed (the
//! watcher's `Ready`), so a session whose sources were complete before
//! watching started becomes ready `settle` after that instead of hanging.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::{Instant, MissedTickBehavior, interval};

/// Default quiet period after the latest add.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(500);

/// Default polling interval.
pub const DEFAULT_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Default)]
struct GateState {
    last_add: Option<Instant>,
    armed_at: Option<Instant>,
    resolved: bool,
}

#[derive(Debug)]
pub struct ReadinessGate {
    settle: Duration,
    poll: Duration,
    state: Mutex<GateState>,
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new(DEFAULT_SETTLE, DEFAULT_POLL)
    }
}

impl ReadinessGate {
    pub fn new(settle: Duration, poll: Duration) -> Self {
        Self {
            settle,
            // A zero period would make `interval` panic.
            poll: poll.max(Duration::from_millis(1)),
            state: Mutex::new(GateState::default()),
        }
    }

    /// Note a file added right now. Ignored once resolved.
    pub fn record_add(&self) {
        let mut state = self.state.lock();
        if !state.resolved {
            state.last_add = Some(Instant::now());
        }
    }

    /// Start the zero-adds countdown. Only the first call counts.
    pub fn arm(&self) {
        self.state.lock().armed_at.get_or_insert_with(Instant::now);
    }

    pub fn is_resolved(&self) -> bool {
        self.state.lock().resolved
    }

    /// Wait until sources have settled. Returns immediately once resolved.
    pub async fn wait(&self) {
        if self.is_resolved() {
            return;
        }

        let first_wait = Instant::now();
        let mut ticker = interval(self.poll);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let mut state = self.state.lock();
            if state.resolved {
                return;
            }

            let baseline = state.last_add.or(state.armed_at).unwrap_or(first_wait);
            if Instant::now().duration_since(baseline) >= self.settle {
                state.resolved = true;
                crate::debug!("start"; "sources settled");
                return;
            }
        }
    }
}
