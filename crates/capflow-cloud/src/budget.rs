//! Cancellation and poll budgets
//!
//! Polling loops get a [`PollBudget`]: a deadline, an interval and a
//! [`CancelSignal`] that Ctrl-C flips.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Creates a linked cancel handle and signal.
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx: Arc::new(tx) }, CancelSignal { rx })
}

/// Sender side; cancelling is permanent.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Receiver side, cheap to clone.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_, signal) = cancel_pair();
        signal
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancelled. Pends forever when the handle is gone.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    /// Sleeps for `duration`. Returns `false` if cancelled first.
    pub async fn sleep(&self, duration: Duration) -> bool {
        if self.is_cancelled() {
            return false;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = self.cancelled() => false,
        }
    }
}

/// Deadline + interval for a polling loop.
#[derive(Debug, Clone)]
pub struct PollBudget {
    deadline: Instant,
    interval: Duration,
    cancel: CancelSignal,
}

impl PollBudget {
    /// Starts the clock now.
    pub fn new(timeout: Duration, interval: Duration, cancel: CancelSignal) -> Self {
        Self {
            deadline: Instant::now() + timeout,
            interval,
            cancel,
        }
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Waits one interval. Returns `false` if cancelled.
    pub async fn pause(&self) -> bool {
        self.cancel.sleep(self.interval).await
    }
}
