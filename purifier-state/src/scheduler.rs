//! Schedulable background tasks with cancel handles
//!
//! Every timer in the engine (reconnect, poll loop, post-write re-poll) is a
//! spawned task owned through a [`TaskHandle`]. Time comes from
//! `tokio::time`, so tests can run with a paused clock.

use std::future::Future;
use std::time::Duration;

use tokio::task::AbortHandle;

/// Handle to a spawned task
///
/// Dropping the handle leaves the task running; call [`TaskHandle::cancel`]
/// to stop it.
#[derive(Debug)]
pub struct TaskHandle {
    handle: AbortHandle,
}

impl TaskHandle {
    /// Abort the task at its next suspension point
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Whether the task has not yet completed
    pub fn is_pending(&self) -> bool {
        !self.handle.is_finished()
    }
}

/// Spawn `task` immediately
pub fn spawn<F>(task: F) -> TaskHandle
where
    F: Future<Output = ()> + Send + 'static,
{
    TaskHandle {
        handle: tokio::spawn(task).abort_handle(),
    }
}

/// Run `task` once `delay` has elapsed
pub fn schedule_after<F>(delay: Duration, task: F) -> TaskHandle
where
    F: Future<Output = ()> + Send + 'static,
{
    spawn(async move {
        tokio::time::sleep(delay).await;
        task.await;
    })
}

/// Cancel whatever task occupies `slot` and leave it empty
pub(crate) fn cancel_slot(slot: &mut Option<TaskHandle>) {
    if let Some(task) = slot.take() {
        task.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_runs_after_delay() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let task = schedule_after(Duration::from_secs(30), async move {
            flag.store(true, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert!(!fired.load(Ordering::SeqCst));
        assert!(task.is_pending());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(fired.load(Ordering::SeqCst));
        assert!(!task.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_run() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let mut slot = Some(schedule_after(Duration::from_secs(1), async move {
            flag.store(true, Ordering::SeqCst);
        }));

        cancel_slot(&mut slot);
        assert!(slot.is_none());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!fired.load(Ordering::SeqCst));
    }
}
