//! Cancellable delayed stages.
//!
//! Every delayed step of a timeline is its own task sleeping until an
//! absolute deadline, so a late stage never waits on an earlier one. Tasks
//! are grouped by key (the incident id, or `agent:<name>` for recovery
//! timers) and can be aborted per group or all at once. A group is pruned
//! once its last task has run.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::debug;

type Groups = BTreeMap<String, BTreeMap<u64, AbortHandle>>;

/// Registry of pending delayed stages.
#[derive(Debug, Default)]
pub struct StageTracker {
    groups: Mutex<Groups>,
    next_seq: AtomicU64,
}

impl StageTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` at `deadline` on a new task tracked under `group`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule<F>(self: &Arc<Self>, group: &str, deadline: Instant, work: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let tracker = Arc::clone(self);
        let key = group.to_owned();

        // Hold the lock across spawn + insert so completion cannot race
        // ahead of registration.
        let mut groups = self.lock();
        let task = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            work();
            tracker.complete(&key, seq);
        });
        groups
            .entry(group.to_owned())
            .or_default()
            .insert(seq, task.abort_handle());
    }

    /// Abort every pending stage of `group`. Returns how many were aborted.
    pub fn cancel(&self, group: &str) -> usize {
        let removed = self.lock().remove(group);
        let count = removed.map_or(0, |tasks| abort_all(tasks.into_values()));
        if count > 0 {
            debug!(group, aborted = count, "cancelled pending stages");
        }
        count
    }

    /// Abort every pending stage. Returns how many were aborted.
    pub fn cancel_all(&self) -> usize {
        let drained = std::mem::take(&mut *self.lock());
        let count = abort_all(drained.into_values().flat_map(BTreeMap::into_values));
        debug!(aborted = count, "cancelled all pending stages");
        count
    }

    /// Number of stages still waiting to run.
    pub fn pending(&self) -> usize {
        self.lock().values().map(BTreeMap::len).sum()
    }

    /// Number of stages of `group` still waiting to run.
    pub fn pending_for(&self, group: &str) -> usize {
        self.lock().get(group).map_or(0, BTreeMap::len)
    }

    /// Keys with at least one pending stage.
    pub fn groups(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    fn complete(&self, group: &str, seq: u64) {
        let mut groups = self.lock();
        if let Some(tasks) = groups.get_mut(group) {
            tasks.remove(&seq);
            if tasks.is_empty() {
                groups.remove(group);
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Groups> {
        self.groups.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn abort_all(handles: impl Iterator<Item = AbortHandle>) -> usize {
    handles.fold(0_usize, |n, handle| {
        handle.abort();
        n.saturating_add(1)
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use super::*;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> Box<dyn FnOnce() + Send>) {
        let fired = Arc::new(AtomicUsize::new(0));
        let handle = Arc::clone(&fired);
        let make = move || -> Box<dyn FnOnce() + Send> {
            let inner = Arc::clone(&handle);
            Box::new(move || {
                inner.fetch_add(1, Ordering::SeqCst);
            })
        };
        (fired, make)
    }

    #[tokio::test(start_paused = true)]
    async fn stages_fire_at_deadline_and_prune() {
        let tracker = Arc::new(StageTracker::new());
        let (fired, job) = counter();
        let start = Instant::now();

        tracker.schedule("A-1", start + Duration::from_millis(1000), job());
        tracker.schedule("A-1", start + Duration::from_millis(2000), job());
        assert_eq!(tracker.pending_for("A-1"), 2);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.pending_for("A-1"), 1);

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.pending(), 0);
        assert!(tracker.groups().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_group_leaves_others() {
        let tracker = Arc::new(StageTracker::new());
        let (fired, job) = counter();
        let deadline = Instant::now() + Duration::from_millis(500);

        tracker.schedule("A-1", deadline, job());
        tracker.schedule("A-1", deadline, job());
        tracker.schedule("B-2", deadline, job());

        assert_eq!(tracker.cancel("A-1"), 2);
        assert_eq!(tracker.cancel("missing"), 0);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_all_stops_everything() {
        let tracker = Arc::new(StageTracker::new());
        let (fired, job) = counter();
        let deadline = Instant::now() + Duration::from_millis(500);

        tracker.schedule("A-1", deadline, job());
        tracker.schedule("agent:Camera Agent", deadline, job());

        assert_eq!(tracker.cancel_all(), 2);
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
