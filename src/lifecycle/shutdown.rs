//! Shutdown coordination.
//!
//! The server stops accepting connections as soon as the signal fires, then
//! gets a grace period to finish open requests. Transaction runs whose
//! callers already left are drained separately, see [`crate::lifecycle::tasks`].

use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Coordinator for graceful shutdown.
///
/// Long-running tasks subscribe to a broadcast channel and stop when it
/// fires.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Fire the shutdown signal. Safe to call with no subscribers.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Wait up to `grace` for `task` to finish.
    ///
    /// Returns `None` if the grace period ran out (the task is aborted) or
    /// the task panicked.
    pub async fn drain<T>(&self, mut task: JoinHandle<T>, grace: Duration) -> Option<T> {
        match tokio::time::timeout(grace, &mut task).await {
            Ok(Ok(output)) => Some(output),
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Task failed during shutdown");
                None
            }
            Err(_) => {
                tracing::warn!(
                    grace_secs = grace.as_secs(),
                    "Grace period elapsed; abandoning in-flight requests"
                );
                task.abort();
                None
            }
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trigger_reaches_all_subscribers() {
        let shutdown = Shutdown::new();
        let mut a = shutdown.subscribe();
        let mut b = shutdown.subscribe();

        shutdown.trigger();
        assert!(a.recv().await.is_ok());
        assert!(b.recv().await.is_ok());
    }

    #[tokio::test]
    async fn test_drain_returns_task_output() {
        let shutdown = Shutdown::new();
        let task = tokio::spawn(async { 7 });
        assert_eq!(shutdown.drain(task, Duration::from_secs(1)).await, Some(7));
    }

    #[tokio::test]
    async fn test_drain_gives_up_after_grace() {
        let shutdown = Shutdown::new();
        let task = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });
        assert_eq!(shutdown.drain(task, Duration::from_millis(20)).await, None);
    }

    #[test]
    fn test_trigger_without_subscribers() {
        Shutdown::default().trigger();
    }
}
