//! Transient capability to cancel and await a running script process.

use tokio::sync::watch;
use tokio_util::sync::{CancellationToken, DropGuard};

/// How a script process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// The process exited on its own. Non-zero codes are not errors.
    Exited { code: i32 },
    /// The process was terminated because cancellation was requested.
    Killed,
    /// The process was terminated by a signal nobody here sent.
    Signaled { signal: i32 },
    /// The exit status could not be collected.
    Unknown,
}

/// Handle to a live script process.
///
/// Cheap to clone; every clone controls the same process. Never persisted.
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    pid: u32,
    cancel: CancellationToken,
    exit: watch::Receiver<Option<ExitOutcome>>,
    settled: CancellationToken,
}

impl ProcessHandle {
    pub(crate) fn new(
        pid: u32,
        cancel: CancellationToken,
        exit: watch::Receiver<Option<ExitOutcome>>,
    ) -> Self {
        Self {
            pid,
            cancel,
            exit,
            settled: CancellationToken::new(),
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Request termination of the process (and its process group).
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// The exit outcome, if the process has already been reaped.
    pub fn exit_outcome(&self) -> Option<ExitOutcome> {
        *self.exit.borrow()
    }

    /// Wait until the process has been reaped.
    pub async fn wait(&self) -> ExitOutcome {
        let mut exit = self.exit.clone();
        let outcome = match exit.wait_for(Option::is_some).await {
            Ok(value) => *value,
            // Runner went away without reporting.
            Err(_) => None,
        };
        outcome.unwrap_or(ExitOutcome::Unknown)
    }

    /// Wait until the owning background unit has finished its bookkeeping.
    pub async fn settled(&self) {
        self.settled.cancelled().await;
    }

    pub fn is_settled(&self) -> bool {
        self.settled.is_cancelled()
    }

    /// Guard that marks the handle settled when dropped, including on panic.
    pub(crate) fn settle_guard(&self) -> DropGuard {
        self.settled.clone().drop_guard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn wait_resolves_once_exit_is_published() {
        let (tx, rx) = watch::channel(None);
        let handle = ProcessHandle::new(1234, CancellationToken::new(), rx);
        assert_eq!(handle.exit_outcome(), None);

        tx.send_replace(Some(ExitOutcome::Exited { code: 3 }));
        assert_eq!(handle.wait().await, ExitOutcome::Exited { code: 3 });
        // Still readable after the sender is gone.
        drop(tx);
        assert_eq!(handle.wait().await, ExitOutcome::Exited { code: 3 });
    }

    #[tokio::test]
    async fn wait_reports_unknown_when_runner_vanishes() {
        let (tx, rx) = watch::channel(None);
        let handle = ProcessHandle::new(1, CancellationToken::new(), rx);
        drop(tx);
        assert_eq!(handle.wait().await, ExitOutcome::Unknown);
    }

    #[tokio::test]
    async fn clones_share_cancellation_and_settlement() {
        let (_tx, rx) = watch::channel(None);
        let handle = ProcessHandle::new(1, CancellationToken::new(), rx);
        let other = handle.clone();

        other.cancel();
        assert!(handle.is_cancelled());

        let guard = handle.settle_guard();
        assert!(!other.is_settled());
        drop(guard);
        other.settled().await;
        assert!(handle.is_settled());
    }
}
