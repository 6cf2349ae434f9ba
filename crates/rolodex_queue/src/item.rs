//! Queue item and priority types.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// Priority tier of a queued reveal request.
///
/// Ordering across tiers is strict (`Urgent > High > Normal`); within a tier
/// the queue preserves enqueue order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Default tier, appended to the back
    Normal,
    /// Ahead of normal work
    High,
    /// Ahead of everything else
    Urgent,
}

/// One pending reveal request owned by the queue.
///
/// Created on enqueue; the queue mutates `retry_count` on failure and moves
/// the item terminally to its completed or failed collection. `metadata` is
/// free-form caller context, passed through untouched.
#[derive(Debug, Clone, Serialize, Deserialize, derive_getters::Getters)]
pub struct QueueItem {
    /// Stable identity of this item
    id: Uuid,
    /// Opaque subject identifier to reveal
    subject_id: String,
    /// Priority tier
    priority: Priority,
    /// When the item entered the queue
    enqueued_at: DateTime<Local>,
    /// Failed attempts so far
    retry_count: u32,
    /// Retry ceiling before the item is marked failed
    max_retries: u32,
    /// Caller-supplied context, not interpreted by the queue
    metadata: HashMap<String, Value>,
}

impl QueueItem {
    /// Create a fresh item with a random id and zero retries.
    pub fn new(
        subject_id: impl Into<String>,
        priority: Priority,
        max_retries: u32,
        metadata: HashMap<String, Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            subject_id: subject_id.into(),
            priority,
            enqueued_at: Local::now(),
            retry_count: 0,
            max_retries,
            metadata,
        }
    }

    /// Whether this item has exhausted its retries.
    pub fn retries_exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }

    pub(crate) fn bump_retry(&mut self) {
        self.retry_count += 1;
    }
}
