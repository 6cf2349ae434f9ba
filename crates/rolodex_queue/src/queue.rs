//! Priority-ordered, daily-quota-aware batch queue.

use crate::{Priority, QueueItem};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Counts describing the queue's current state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct QueueStats {
    /// Items waiting to be dequeued
    pending: usize,
    /// Items handed out and awaiting a completion report
    in_flight: usize,
    /// Items completed successfully
    completed: usize,
    /// Items permanently failed
    failed: usize,
    /// Items processed successfully today
    daily_processed: u32,
    /// Daily processing limit
    daily_limit: u32,
    /// Slots remaining today
    daily_remaining: u32,
}

/// Priority work queue of pending reveal requests.
///
/// Insertion keeps FIFO order within each priority tier and strict ordering
/// across tiers. `next_batch` respects the queue's own daily processing
/// quota, which mirrors the rate limiter's daily reset semantics but is
/// tracked independently; the orchestrator keeps the two views in sync by
/// being the only writer to both.
///
/// The queue serializes all mutation behind its owner — methods take
/// `&mut self` and the orchestrator holds it behind one async mutex.
///
/// # Example
///
/// ```
/// use rolodex_queue::{BatchQueue, Priority};
/// use std::collections::HashMap;
///
/// let mut queue = BatchQueue::new(100, 3);
/// queue.enqueue("subj-1", Priority::Normal, HashMap::new());
/// queue.enqueue("subj-2", Priority::Urgent, HashMap::new());
///
/// let batch = queue.next_batch(Some(10));
/// assert_eq!(batch[0].subject_id(), "subj-2");
/// ```
#[derive(Debug)]
pub struct BatchQueue {
    pending: VecDeque<QueueItem>,
    in_flight: HashMap<Uuid, QueueItem>,
    completed: HashMap<Uuid, QueueItem>,
    failed: HashMap<Uuid, QueueItem>,
    daily_processed: u32,
    day_start: NaiveDate,
    daily_limit: u32,
    default_max_retries: u32,
}

impl BatchQueue {
    /// Create a queue with a daily processing limit and per-item retry ceiling.
    pub fn new(daily_limit: u32, default_max_retries: u32) -> Self {
        Self {
            pending: VecDeque::new(),
            in_flight: HashMap::new(),
            completed: HashMap::new(),
            failed: HashMap::new(),
            daily_processed: 0,
            day_start: Local::now().date_naive(),
            daily_limit,
            default_max_retries,
        }
    }

    /// Enqueue one subject for reveal; returns the item's stable id.
    ///
    /// `metadata` is passed through untouched to the eventual reveal context.
    #[instrument(skip(self, metadata))]
    pub fn enqueue(
        &mut self,
        subject_id: impl Into<String> + std::fmt::Debug,
        priority: Priority,
        metadata: HashMap<String, Value>,
    ) -> Uuid {
        let item = QueueItem::new(subject_id, priority, self.default_max_retries, metadata);
        let id = *item.id();
        self.insert_by_priority(item);
        debug!(%id, pending = self.pending.len(), "Enqueued reveal request");
        id
    }

    /// Enqueue many subjects with a shared priority and metadata.
    pub fn enqueue_many(
        &mut self,
        subject_ids: impl IntoIterator<Item = impl Into<String> + std::fmt::Debug>,
        priority: Priority,
        metadata: HashMap<String, Value>,
    ) -> Vec<Uuid> {
        subject_ids
            .into_iter()
            .map(|subject_id| self.enqueue(subject_id, priority, metadata.clone()))
            .collect()
    }

    /// Insert after all pending items of equal or higher priority.
    ///
    /// FIFO within a tier, strict ordering across tiers.
    fn insert_by_priority(&mut self, item: QueueItem) {
        let position = self
            .pending
            .iter()
            .position(|pending| pending.priority() < item.priority())
            .unwrap_or(self.pending.len());
        self.pending.insert(position, item);
    }

    /// Dequeue the next batch, bounded by the daily quota.
    ///
    /// Returns an empty batch when no daily slots remain — a normal
    /// "try again later" signal, not an error. Items that already exhausted
    /// their retries move straight to the failed collection instead of being
    /// returned. Dequeued items are held in flight until
    /// [`mark_done`](Self::mark_done) reports their outcome.
    #[instrument(skip(self))]
    pub fn next_batch(&mut self, max_size: Option<usize>) -> Vec<QueueItem> {
        self.roll_day();

        let available = self.daily_limit.saturating_sub(self.daily_processed) as usize;
        if available == 0 {
            debug!(
                daily_processed = self.daily_processed,
                daily_limit = self.daily_limit,
                "Daily processing quota exhausted, returning empty batch"
            );
            return Vec::new();
        }
        let requested = max_size.unwrap_or(usize::MAX).min(available);

        // Ids already handed out or finished; skipping them is defensive,
        // duplicates should not normally reach the pending sequence.
        let busy: HashSet<Uuid> = self
            .in_flight
            .keys()
            .chain(self.completed.keys())
            .copied()
            .collect();

        let mut batch = Vec::new();
        while batch.len() < requested {
            let Some(item) = self.pending.pop_front() else {
                break;
            };
            if busy.contains(item.id()) {
                warn!(id = %item.id(), "Skipping item already in flight or completed");
                continue;
            }
            if item.retries_exhausted() {
                debug!(id = %item.id(), retries = item.retry_count(), "Retries exhausted, marking failed");
                self.failed.insert(*item.id(), item);
                continue;
            }
            self.in_flight.insert(*item.id(), item.clone());
            batch.push(item);
        }

        debug!(size = batch.len(), "Dequeued batch");
        batch
    }

    /// Report the outcome of an in-flight item.
    ///
    /// Success moves the item to the completed collection and counts against
    /// the daily quota. Failure increments its retry count and re-enqueues it
    /// at the back while under the ceiling, otherwise the item is failed
    /// permanently. Unknown ids are ignored with a warning.
    #[instrument(skip(self))]
    pub fn mark_done(&mut self, id: Uuid, success: bool) {
        let Some(mut item) = self.in_flight.remove(&id) else {
            warn!(%id, "mark_done for unknown or already-settled item");
            return;
        };

        if success {
            self.daily_processed += 1;
            self.completed.insert(id, item);
            return;
        }

        item.bump_retry();
        if item.retries_exhausted() {
            debug!(%id, retries = item.retry_count(), "Item failed permanently");
            self.failed.insert(id, item);
        } else {
            debug!(%id, retries = item.retry_count(), "Re-enqueueing failed item");
            self.pending.push_back(item);
        }
    }

    /// Return an in-flight item to pending without consuming a retry.
    ///
    /// For items pulled into a batch that aborted before any attempt was
    /// made on them; the failure was not theirs, so their retry budget is
    /// untouched. The item re-enters the pending sequence at its normal
    /// priority position. Unknown ids are ignored with a warning.
    #[instrument(skip(self))]
    pub fn restore(&mut self, id: Uuid) {
        let Some(item) = self.in_flight.remove(&id) else {
            warn!(%id, "restore for unknown or already-settled item");
            return;
        };
        debug!(%id, "Restoring unattempted item to pending");
        self.insert_by_priority(item);
    }

    /// Drop completed items, returning how many were reclaimed.
    ///
    /// The queue never auto-evicts completed items; long-running processes
    /// must call this periodically.
    pub fn clear_completed(&mut self) -> usize {
        let count = self.completed.len();
        self.completed.clear();
        count
    }

    /// Current queue counts.
    pub fn stats(&mut self) -> QueueStats {
        self.roll_day();
        QueueStats {
            pending: self.pending.len(),
            in_flight: self.in_flight.len(),
            completed: self.completed.len(),
            failed: self.failed.len(),
            daily_processed: self.daily_processed,
            daily_limit: self.daily_limit,
            daily_remaining: self.daily_limit.saturating_sub(self.daily_processed),
        }
    }

    /// Look up a permanently failed item.
    pub fn failed_item(&self, id: &Uuid) -> Option<&QueueItem> {
        self.failed.get(id)
    }

    /// Whether any items are waiting to be dequeued.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Reset the daily counter when the wall-clock date has advanced.
    fn roll_day(&mut self) {
        let today = Local::now().date_naive();
        if today != self.day_start {
            debug!(
                previous = %self.day_start,
                current = %today,
                "Queue daily window rolled over"
            );
            self.day_start = today;
            self.daily_processed = 0;
        }
    }
}
