//! Shared per-episode training record.
//!
//! The trainer appends episode statistics after every batch; a plotting thread
//! reads them concurrently.
//!
//! ```text
//! Trainer Thread                              Plotter Thread
//! ┌──────────────────┐                        ┌──────────────────┐
//! │ batch callback   │                        │ poll loop        │
//! │       ↓          │                        │       ↑          │
//! │ append_batch() ──────SharedTrainingRecord───→ snapshot()     │
//! └──────────────────┘                        └──────────────────┘
//! ```
//!
//! Returns and lengths are written inside one critical section, so a snapshot
//! never pairs a return with a missing (or foreign) length.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Episode statistics accumulated over a training run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingRecord {
    /// Cumulative reward of each completed episode, in completion order
    pub episodic_returns: Vec<f32>,
    /// Number of environment steps of each completed episode
    pub episodic_lengths: Vec<u64>,
}

impl TrainingRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded episodes.
    pub fn len(&self) -> usize {
        self.episodic_returns.len()
    }

    /// True when no episode has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.episodic_returns.is_empty()
    }
}

struct SharedInner {
    record: Mutex<TrainingRecord>,
    /// Mirrors `record.len()` so pollers can skip the lock when nothing changed
    episodes: AtomicUsize,
    /// Number of `append_batch` calls
    batches: AtomicUsize,
}

/// Thread-safe handle to a [`TrainingRecord`].
///
/// Cloning the handle shares the same record.
#[derive(Clone)]
pub struct SharedTrainingRecord {
    inner: Arc<SharedInner>,
}

impl SharedTrainingRecord {
    /// Create a handle to a new, empty record.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SharedInner {
                record: Mutex::new(TrainingRecord::new()),
                episodes: AtomicUsize::new(0),
                batches: AtomicUsize::new(0),
            }),
        }
    }

    /// Append the episodes completed during one batch.
    ///
    /// Both sequences are extended under the same lock. `lengths` may be empty
    /// when the producer does not track episode lengths; readers then fall
    /// back to batch-based step estimates.
    pub fn append_batch(&self, returns: &[f32], lengths: &[u64]) {
        let mut record = self.inner.record.lock();
        record.episodic_returns.extend_from_slice(returns);
        record.episodic_lengths.extend_from_slice(lengths);
        self.inner
            .episodes
            .store(record.episodic_returns.len(), Ordering::Release);
        self.inner.batches.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the record out under the lock.
    pub fn snapshot(&self) -> TrainingRecord {
        self.inner.record.lock().clone()
    }

    /// Number of recorded episodes, without taking the lock.
    pub fn episode_count(&self) -> usize {
        self.inner.episodes.load(Ordering::Acquire)
    }

    /// Number of batches appended so far.
    pub fn batch_count(&self) -> usize {
        self.inner.batches.load(Ordering::Relaxed)
    }
}

impl Default for SharedTrainingRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SharedTrainingRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedTrainingRecord")
            .field("episodes", &self.episode_count())
            .field("batches", &self.batch_count())
            .finish()
    }
}

/// Create a shared, empty training record.
pub fn training_record() -> SharedTrainingRecord {
    SharedTrainingRecord::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_append_and_snapshot() {
        let record = training_record();
        record.append_batch(&[1.0, 2.0], &[50, 50]);
        record.append_batch(&[3.0], &[50]);

        let snapshot = record.snapshot();
        assert_eq!(snapshot.episodic_returns, vec![1.0, 2.0, 3.0]);
        assert_eq!(snapshot.episodic_lengths, vec![50, 50, 50]);
        assert_eq!(record.episode_count(), 3);
        assert_eq!(record.batch_count(), 2);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let record = training_record();
        record.append_batch(&[1.0], &[10]);
        let snapshot = record.snapshot();
        record.append_batch(&[2.0], &[10]);

        assert_eq!(snapshot.len(), 1);
        assert_eq!(record.snapshot().len(), 2);
    }

    #[test]
    fn test_empty_batch_still_counts() {
        let record = training_record();
        record.append_batch(&[], &[]);
        assert!(record.snapshot().is_empty());
        assert_eq!(record.batch_count(), 1);
    }

    #[test]
    fn test_concurrent_snapshots_are_never_torn() {
        let record = training_record();
        let writer = {
            let record = record.clone();
            thread::spawn(move || {
                for i in 0..500 {
                    record.append_batch(&[i as f32, i as f32], &[i, i]);
                }
            })
        };

        for _ in 0..500 {
            let snapshot = record.snapshot();
            assert_eq!(
                snapshot.episodic_returns.len(),
                snapshot.episodic_lengths.len(),
                "returns and lengths must be appended together"
            );
        }

        writer.join().unwrap();
        assert_eq!(record.episode_count(), 1000);
    }
}
