//! Queue-driven batch processing loops.

use crate::client::EnrichmentClient;
use rolodex_core::ProgressCallback;
use rolodex_error::RolodexResult;
use rolodex_interface::EnrichmentTransport;
use rolodex_queue::QueueStats;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Outcome of one queue-driven batch.
#[derive(Debug, Clone, Serialize, Deserialize, derive_getters::Getters)]
pub struct QueueBatchResult {
    /// Items pulled and processed in this batch
    processed: usize,
    /// Items that revealed successfully
    succeeded: usize,
    /// Items that failed (and were re-enqueued or failed permanently)
    failed: usize,
    /// Queue counts after the batch settled
    stats: QueueStats,
}

/// Why a queue-draining run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum StopReason {
    /// No pending items remain
    QueueEmpty,
    /// Items remain but the daily processing quota is exhausted
    DailyQuotaExhausted,
    /// The configured batch ceiling for this run was reached
    MaxBatchesReached,
}

/// Accumulated totals of a queue-draining run.
#[derive(Debug, Clone, Serialize, Deserialize, derive_getters::Getters)]
pub struct QueueRunSummary {
    /// Batches that processed at least one item
    batches_run: usize,
    /// Items processed across all batches
    total_processed: usize,
    /// Items revealed successfully
    total_succeeded: usize,
    /// Items that failed
    total_failed: usize,
    /// Why the run stopped
    stop_reason: StopReason,
    /// Queue counts after the run
    stats: QueueStats,
}

impl<T: EnrichmentTransport> EnrichmentClient<T> {
    /// Pull one batch from the queue, reveal it, and settle the outcomes.
    ///
    /// An empty result (`processed == 0`) means the queue had nothing
    /// available — either no pending items or no daily slots — and is a
    /// normal "try again later" signal. If the batch aborts before any
    /// reveal (credit precheck failure), the pulled items are restored to
    /// pending with their retry budget intact and the error propagates.
    #[instrument(skip(self, progress))]
    pub async fn process_queue_batch(
        &self,
        batch_size: Option<usize>,
        progress: Option<ProgressCallback>,
    ) -> RolodexResult<QueueBatchResult> {
        let pull = batch_size
            .unwrap_or(self.config.batch_ceiling)
            .min(self.config.batch_ceiling)
            .max(1);

        let items = { self.queue.lock().await.next_batch(Some(pull)) };
        if items.is_empty() {
            let stats = self.queue.lock().await.stats();
            return Ok(QueueBatchResult {
                processed: 0,
                succeeded: 0,
                failed: 0,
                stats,
            });
        }

        let subject_ids: Vec<String> = items
            .iter()
            .map(|item| item.subject_id().clone())
            .collect();

        let envelopes = match self.batch_reveal(&subject_ids, pull, progress).await {
            Ok(envelopes) => envelopes,
            Err(error) => {
                // The abort happened before any item was attempted, so the
                // items go back without spending their retry budget.
                warn!(%error, count = items.len(), "Batch aborted, restoring pulled items");
                let mut queue = self.queue.lock().await;
                for item in &items {
                    queue.restore(*item.id());
                }
                return Err(error);
            }
        };

        let mut queue = self.queue.lock().await;
        let mut succeeded = 0;
        let mut failed = 0;
        for (item, envelope) in items.iter().zip(&envelopes) {
            queue.mark_done(*item.id(), *envelope.success());
            if *envelope.success() {
                succeeded += 1;
            } else {
                failed += 1;
            }
        }

        let stats = queue.stats();
        debug!(
            processed = items.len(),
            succeeded, failed, "Queue batch settled"
        );
        Ok(QueueBatchResult {
            processed: items.len(),
            succeeded,
            failed,
            stats,
        })
    }

    /// Drain the queue in repeated batches.
    ///
    /// Stops when the queue is empty, when a batch processes zero items
    /// while work is still pending (daily quota exhausted), or when
    /// `max_batches` is reached. Sleeps `inter_batch_delay` between batches
    /// to respect rate limits; `None` uses the configured default.
    #[instrument(skip(self, progress))]
    pub async fn process_queue_until_empty(
        &self,
        batch_size: Option<usize>,
        max_batches: Option<usize>,
        progress: Option<ProgressCallback>,
        inter_batch_delay: Option<Duration>,
    ) -> RolodexResult<QueueRunSummary> {
        let delay = inter_batch_delay
            .unwrap_or_else(|| Duration::from_millis(self.config.inter_batch_delay_ms));

        let mut batches_run = 0;
        let mut total_processed = 0;
        let mut total_succeeded = 0;
        let mut total_failed = 0;

        let stop_reason = loop {
            if let Some(max) = max_batches {
                if batches_run >= max {
                    break StopReason::MaxBatchesReached;
                }
            }

            let result = self
                .process_queue_batch(batch_size, progress.clone())
                .await?;

            if *result.processed() == 0 {
                let has_pending = self.queue.lock().await.has_pending();
                break if has_pending {
                    StopReason::DailyQuotaExhausted
                } else {
                    StopReason::QueueEmpty
                };
            }

            batches_run += 1;
            total_processed += *result.processed();
            total_succeeded += *result.succeeded();
            total_failed += *result.failed();

            // No pause after the final batch of a drain.
            if self.queue.lock().await.has_pending() {
                tokio::time::sleep(delay).await;
            }
        };

        let stats = self.queue.lock().await.stats();
        debug!(
            batches_run,
            total_processed,
            %stop_reason,
            "Queue drain finished"
        );
        Ok(QueueRunSummary {
            batches_run,
            total_processed,
            total_succeeded,
            total_failed,
            stop_reason,
            stats,
        })
    }
}
