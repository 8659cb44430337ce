//! # Debouncer
//!
//! Collapses bursts of edits into a single delayed emission.
//!
//! Each call to [`Debouncer::schedule`] replaces the pending emission, so only
//! the last scheduled future runs, and only after a full quiet interval.
//! [`Debouncer::cancel`] drops the pending emission entirely, which is how a
//! context switch keeps stale content from landing after fresher content.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Cancellable trailing-edge debouncer backed by a tokio task
#[derive(Debug)]
pub struct Debouncer {
    name: &'static str,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    /// Create a debouncer; `name` only shows up in trace output
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            pending: None,
        }
    }

    /// Run `emit` after `delay`, replacing any emission still pending.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(&mut self, delay: Duration, emit: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.cancel() {
            tracing::trace!("[{}] rescheduled pending emission", self.name);
        }

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            emit.await;
        }));
    }

    /// Drop the pending emission. Returns true if one was actually pending.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                true
            }
            _ => false,
        }
    }

    /// Whether an emission is scheduled and has not run yet
    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[tokio::test(start_paused = true)]
    async fn test_only_last_emission_runs() {
        let mut debouncer = Debouncer::new("test");
        let seen = Arc::new(Mutex::new(Vec::new()));

        for value in ["a", "ab", "abc"] {
            let seen = seen.clone();
            debouncer.schedule(Duration::from_millis(500), async move {
                seen.lock().unwrap().push(value);
            });
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        assert!(debouncer.is_pending());
        tokio::time::sleep(Duration::from_millis(600)).await;

        assert_eq!(*seen.lock().unwrap(), vec!["abc"]);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_pending_emission() {
        let mut debouncer = Debouncer::new("test");
        let count = Arc::new(AtomicUsize::new(0));

        let c = count.clone();
        debouncer.schedule(Duration::from_millis(500), async move {
            c.fetch_add(1, Ordering::SeqCst);
        });

        assert!(debouncer.cancel());
        assert!(!debouncer.cancel());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_emission_waits_for_quiet_interval() {
        let mut debouncer = Debouncer::new("test");
        let count = Arc::new(AtomicUsize::new(0));

        let c = count.clone();
        debouncer.schedule(Duration::from_millis(500), async move {
            c.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(499)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
