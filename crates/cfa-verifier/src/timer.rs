use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use cfa_budget::Limit;

use crate::shutdown::ShutdownScope;

/// A background timer enforcing a round's limits (spec.md §4.4 step 2):
/// sleeps until the earliest limit's `to_next_check`, then triggers
/// `scope` unless [`RoundTimer::stop`] was called first.
pub struct RoundTimer {
    stop_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl RoundTimer {
    pub fn start(limits: &[Limit], scope: Arc<ShutdownScope>) -> Self {
        let wait = limits.iter().map(|limit| limit.to_next_check()).min().unwrap_or(Duration::ZERO);
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let handle = thread::spawn(move || {
            if stop_rx.recv_timeout(wait).is_err() {
                tracing::debug!(?wait, "round limit expired, triggering shutdown");
                scope.trigger();
            }
        });
        Self { stop_tx, handle }
    }

    /// Cancels the pending trigger and waits for the timer thread to exit.
    pub fn stop(self) {
        let _ = self.stop_tx.send(());
        let _ = self.handle.join();
    }
}
