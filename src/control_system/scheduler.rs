//! Delayed continuations with bulk cancellation.
//!
//! Cancelling does not wake a suspended task early. The task still sleeps
//! until its timer fires, then learns that its registration was voided and
//! must not act on the wake.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Wake {
    Elapsed,
    Cancelled,
}

impl Wake {
    pub fn is_cancelled(self) -> bool {
        self == Wake::Cancelled
    }
}

#[derive(Debug, Default)]
struct Registry {
    next_id: u64,
    pending: HashSet<u64>,
}

/// Tracks every outstanding wait registered through it.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    registry: Arc<Mutex<Registry>>,
}

// Drops the registration if the waiting future is abandoned.
struct Registration<'a> {
    scheduler: &'a Scheduler,
    id: u64,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.scheduler.registry().pending.remove(&self.id);
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        // The registry holds plain ids, so a poisoned lock is still consistent.
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn register(&self) -> Registration<'_> {
        let mut registry = self.registry();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.pending.insert(id);
        Registration {
            scheduler: self,
            id,
        }
    }

    /// Resolve after at least `duration`. Reports whether the registration
    /// survived until the timer fired.
    pub async fn wait(&self, duration: Duration) -> Wake {
        let registration = self.register();
        sleep(duration).await;
        let live = self.registry().pending.remove(&registration.id);
        if live {
            Wake::Elapsed
        } else {
            Wake::Cancelled
        }
    }

    /// Void every outstanding registration. Returns how many were voided.
    pub fn cancel_all(&self) -> usize {
        let mut registry = self.registry();
        let voided = registry.pending.len();
        registry.pending.clear();
        voided
    }

    pub fn pending(&self) -> usize {
        self.registry().pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn wait_elapses_after_duration() {
        let scheduler = Scheduler::new();
        let started = Instant::now();
        assert_eq!(scheduler.wait(Duration::from_millis(750)).await, Wake::Elapsed);
        assert!(started.elapsed() >= Duration::from_millis(750));
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_duration_resolves() {
        let scheduler = Scheduler::new();
        assert_eq!(scheduler.wait(Duration::ZERO).await, Wake::Elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_wait_still_sleeps_full_duration() {
        let scheduler = Scheduler::new();
        let waiter = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move {
                let started = Instant::now();
                let wake = scheduler.wait(Duration::from_secs(2)).await;
                (wake, started.elapsed())
            })
        };

        sleep(Duration::from_millis(100)).await;
        assert_eq!(scheduler.pending(), 1);
        assert_eq!(scheduler.cancel_all(), 1);
        assert_eq!(scheduler.pending(), 0);

        let (wake, elapsed) = waiter.await.unwrap();
        assert_eq!(wake, Wake::Cancelled);
        assert!(elapsed >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn waits_registered_after_cancel_are_live() {
        let scheduler = Scheduler::new();
        scheduler.cancel_all();
        assert_eq!(scheduler.wait(Duration::from_millis(10)).await, Wake::Elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_wait_is_unregistered() {
        let scheduler = Scheduler::new();
        let result = tokio::time::timeout(
            Duration::from_millis(50),
            scheduler.wait(Duration::from_secs(10)),
        )
        .await;
        assert!(result.is_err());
        assert_eq!(scheduler.pending(), 0);
    }
}
