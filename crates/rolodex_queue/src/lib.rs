//! Priority batch queue for pending reveal requests.
//!
//! The queue is the sole owner of its items: callers enqueue subjects, pull
//! daily-quota-aware batches, and report completions back through
//! [`BatchQueue::mark_done`]. Items move `pending → in-flight → (completed |
//! re-enqueued | failed)` with stable uuid identities, never shared across
//! concurrent mutators.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod item;
mod queue;

pub use item::{Priority, QueueItem};
pub use queue::{BatchQueue, QueueStats};
