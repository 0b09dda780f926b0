//! In-flight transaction tasks.
//!
//! Deploy and update handlers run the lifecycle on a task owned by
//! [`InFlight`] rather than on the request future, so a caller that hangs up
//! does not cancel a transaction that is already on the wire. At shutdown the
//! process waits for these tasks, bounded by the grace period.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinSet;

/// Tracker for detached lifecycle runs.
#[derive(Clone, Default)]
pub struct InFlight {
    tasks: Arc<Mutex<JoinSet<()>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `future` on a tracked task.
    ///
    /// The receiver yields its output; dropping the receiver does not stop
    /// the task. A closed receiver means the task panicked.
    pub fn spawn<F, T>(&self, future: F) -> oneshot::Receiver<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let mut tasks = self.lock();
        // Reap finished runs so the set only holds live ones.
        while tasks.try_join_next().is_some() {}
        tasks.spawn(async move {
            let _ = tx.send(future.await);
        });
        rx
    }

    /// Tasks that have not been reaped yet.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait up to `grace` for every tracked task.
    ///
    /// Returns `false` if the grace period ran out; the stragglers are aborted.
    pub async fn drain(&self, grace: Duration) -> bool {
        let mut tasks = std::mem::take(&mut *self.lock());
        if tasks.is_empty() {
            return true;
        }
        tracing::info!(
            in_flight = tasks.len(),
            grace_secs = grace.as_secs(),
            "Waiting for in-flight transactions"
        );

        let finished = tokio::time::timeout(grace, async {
            while let Some(result) = tasks.join_next().await {
                if let Err(e) = result {
                    tracing::error!(error = %e, "In-flight transaction task failed");
                }
            }
        })
        .await;

        match finished {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!(
                    abandoned = tasks.len(),
                    "Grace period elapsed; abandoning in-flight transactions"
                );
                tasks.abort_all();
                false
            }
        }
    }
}

impl std::fmt::Debug for InFlight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InFlight").field("tasks", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn test_spawn_returns_output() {
        let tasks = InFlight::new();
        let rx = tasks.spawn(async { 42 });
        assert_eq!(rx.await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_drain_waits_for_abandoned_task() {
        let tasks = InFlight::new();
        let done = Arc::new(AtomicBool::new(false));

        let flag = done.clone();
        let rx = tasks.spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            flag.store(true, Ordering::SeqCst);
        });
        // The caller went away.
        drop(rx);

        assert!(tasks.drain(Duration::from_secs(5)).await);
        assert!(done.load(Ordering::SeqCst));
        assert!(tasks.is_empty());
    }

    #[tokio::test]
    async fn test_drain_gives_up_after_grace() {
        let tasks = InFlight::new();
        let _rx = tasks.spawn(tokio::time::sleep(Duration::from_secs(3600)));

        assert!(!tasks.drain(Duration::from_millis(20)).await);
        assert!(tasks.is_empty());
    }

    #[tokio::test]
    async fn test_finished_tasks_are_reaped() {
        let tasks = InFlight::new();
        tasks.spawn(async {}).await.unwrap();
        tasks.spawn(async {}).await.unwrap();
        tokio::task::yield_now().await;

        let _rx = tasks.spawn(std::future::pending::<()>());
        assert_eq!(tasks.len(), 1);
        assert!(!tasks.drain(Duration::from_millis(10)).await);
    }
}
