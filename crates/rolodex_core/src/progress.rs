//! Progress reporting types for batch operations.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Callback invoked once per completed batch item.
///
/// Callbacks must not panic; the orchestrator isolates and logs panics
/// without aborting the batch, but a well-behaved consumer should stay
/// cheap and infallible.
pub type ProgressCallback = Arc<dyn Fn(&ProgressEvent) + Send + Sync + 'static>;

/// Snapshot of batch progress after one item completed.
///
/// # Examples
///
/// ```
/// use rolodex_core::ProgressEvent;
///
/// fn log_progress(event: &ProgressEvent) {
///     println!(
///         "{}/{} done ({:.0}% ok), ~{:?}s left",
///         event.current(),
///         event.total(),
///         event.success_rate() * 100.0,
///         event.estimated_remaining_secs(),
///     );
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, derive_getters::Getters)]
pub struct ProgressEvent {
    /// Items completed so far (success or failure)
    current: usize,
    /// Total items in the batch
    total: usize,
    /// Items that completed successfully
    successful: usize,
    /// Items that failed
    failed: usize,
    /// successful / current, 0.0 when nothing completed yet
    success_rate: f64,
    /// Seconds elapsed since the batch started
    elapsed_secs: f64,
    /// Average seconds per completed item
    avg_time_per_item: f64,
    /// Estimated seconds until the batch completes
    estimated_remaining_secs: Option<f64>,
    /// Items not yet completed
    remaining_items: usize,
    /// Messages of the most recent failures (at most three)
    recent_errors: Vec<String>,
    /// Credits consumed by the batch so far
    credits_used: u32,
    /// Account credits remaining, from the latest response that reported them
    credits_remaining: Option<u32>,
}

impl ProgressEvent {
    /// Build a snapshot from running batch counters.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        current: usize,
        total: usize,
        successful: usize,
        failed: usize,
        elapsed_secs: f64,
        recent_errors: Vec<String>,
        credits_used: u32,
        credits_remaining: Option<u32>,
    ) -> Self {
        let success_rate = if current > 0 {
            successful as f64 / current as f64
        } else {
            0.0
        };
        let avg_time_per_item = if current > 0 {
            elapsed_secs / current as f64
        } else {
            0.0
        };
        let remaining_items = total.saturating_sub(current);
        let estimated_remaining_secs = if current > 0 {
            Some(avg_time_per_item * remaining_items as f64)
        } else {
            None
        };
        Self {
            current,
            total,
            successful,
            failed,
            success_rate,
            elapsed_secs,
            avg_time_per_item,
            estimated_remaining_secs,
            remaining_items,
            recent_errors,
            credits_used,
            credits_remaining,
        }
    }
}
