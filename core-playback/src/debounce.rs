//! Single-slot task timers.
//!
//! A [`TimerSlot`] owns at most one spawned task. Scheduling a new task
//! aborts the previous one, which gives "last request wins" debouncing for
//! seeks and snapshot writes and a cancellable handle for retry timers and
//! readiness polls. Dropping the slot aborts its task.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Debug, Default)]
pub struct TimerSlot {
    handle: Option<JoinHandle<()>>,
}

impl TimerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` after `delay`, replacing any task already scheduled.
    pub fn schedule_after<F>(&mut self, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        });
    }

    /// Run `task` immediately, replacing any task already scheduled.
    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        self.handle = Some(tokio::spawn(task));
    }

    /// Abort the scheduled task. Returns `true` if one was still running.
    pub fn cancel(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                let running = !handle.is_finished();
                handle.abort();
                running
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn rescheduling_keeps_only_last_task() {
        let fired = Arc::new(AtomicU32::new(0));
        let last = Arc::new(AtomicU32::new(0));
        let mut slot = TimerSlot::new();

        for i in 1..=10 {
            let fired = fired.clone();
            let last = last.clone();
            slot.schedule_after(Duration::from_millis(50), async move {
                fired.fetch_add(1, Ordering::SeqCst);
                last.store(i, Ordering::SeqCst);
            });
            tokio::time::advance(Duration::from_millis(20)).await;
        }

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(last.load(Ordering::SeqCst), 10);
        assert!(!slot.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_execution() {
        let fired = Arc::new(AtomicU32::new(0));
        let mut slot = TimerSlot::new();
        let counter = fired.clone();
        slot.schedule_after(Duration::from_secs(1), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(slot.is_pending());
        assert!(slot.cancel());
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(!slot.cancel());
    }
}
