//! Cancel-on-supersede background tasks

use std::future::Future;
use tokio::task::JoinHandle;

/// Holds at most one spawned task
///
/// Starting a new task aborts the previous one, and dropping the holder
/// aborts whatever is still running.
#[derive(Debug, Default)]
pub struct SupersedingTask {
    handle: Option<JoinHandle<()>>,
}

impl SupersedingTask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `future`, aborting the task it replaces
    ///
    /// Must be called from within a tokio runtime.
    pub fn replace<F>(&mut self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        self.handle = Some(tokio::spawn(future));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for SupersedingTask {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn counting_task(counter: Arc<AtomicUsize>, delay: Duration) -> impl Future<Output = ()> {
        async move {
            tokio::time::sleep(delay).await;
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_replacing_aborts_previous_task() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let mut task = SupersedingTask::new();

        task.replace(counting_task(first.clone(), Duration::from_millis(100)));
        task.replace(counting_task(second.clone(), Duration::from_millis(100)));

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert!(!task.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_aborts_running_task() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let mut task = SupersedingTask::new();
            task.replace(counting_task(counter.clone(), Duration::from_millis(50)));
            assert!(task.is_active());
        }

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_is_idempotent() {
        let mut task = SupersedingTask::new();
        task.cancel();
        task.replace(async {});
        task.cancel();
        task.cancel();
        assert!(!task.is_active());
    }
}
