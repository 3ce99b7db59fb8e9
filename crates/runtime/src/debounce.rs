use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::trace;

/// Handle given to a debounced task so it can re-check liveness after it
/// has started running.
#[derive(Debug, Clone)]
pub struct DebounceTicket {
    epoch: Arc<AtomicU64>,
    value: u64,
}

impl DebounceTicket {
    /// `false` once the debouncer was cancelled or re-scheduled.
    pub fn is_live(&self) -> bool {
        self.epoch.load(Ordering::Acquire) == self.value
    }
}

/// Delayed task with `schedule` / `cancel` semantics.
///
/// Only the most recently scheduled task can fire. Scheduling again or
/// calling [`Debouncer::cancel`] before the delay elapses supersedes the
/// pending task. A task that already started is never aborted; it receives
/// a [`DebounceTicket`] and is expected to check [`DebounceTicket::is_live`]
/// before committing.
///
/// Timing uses `tokio::time`, so tests can drive it with a paused clock.
/// `schedule` must be called from within a tokio runtime.
#[derive(Debug, Default)]
pub struct Debouncer {
    epoch: Arc<AtomicU64>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule<F, Fut>(&self, delay: Duration, task: F) -> DebounceTicket
    where
        F: FnOnce(DebounceTicket) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let value = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        let ticket = DebounceTicket {
            epoch: Arc::clone(&self.epoch),
            value,
        };
        let fired = ticket.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if !fired.is_live() {
                trace!(ticket = fired.value, "debounced task superseded");
                return;
            }
            task(fired).await;
        });
        ticket
    }

    /// Supersedes whatever is pending. Idempotent.
    pub fn cancel(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
    }
}
