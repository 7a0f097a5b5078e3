//! Tasks owned by one pipeline instance.

use parking_lot::Mutex;
use std::future::Future;
use tokio::task::AbortHandle;

/// The stage tasks of one pipeline.
///
/// Dropping the group aborts every task that is still running.
#[derive(Default)]
pub(crate) struct StageTasks {
    handles: Mutex<Vec<AbortHandle>>,
}

impl StageTasks {
    /// Spawns a task on the current runtime.
    pub(crate) fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(task);
        self.handles.lock().push(handle.abort_handle());
    }

    /// Aborts all tasks.
    pub(crate) fn abort_all(&self) {
        for handle in self.handles.lock().drain(..) {
            handle.abort();
        }
    }

    /// Returns the number of tasks not yet finished.
    pub(crate) fn active(&self) -> usize {
        self.handles
            .lock()
            .iter()
            .filter(|handle| !handle.is_finished())
            .count()
    }
}

impl Drop for StageTasks {
    fn drop(&mut self) {
        self.abort_all();
    }
}

impl std::fmt::Debug for StageTasks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageTasks")
            .field("active", &self.active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_drop_aborts_running_tasks() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&finished);

        let tasks = StageTasks::default();
        tasks.spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            flag.store(true, Ordering::SeqCst);
        });
        assert_eq!(tasks.active(), 1);

        drop(tasks);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_finished_tasks_are_not_active() {
        let tasks = StageTasks::default();
        tasks.spawn(async {});
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(tasks.active(), 0);
    }
}
