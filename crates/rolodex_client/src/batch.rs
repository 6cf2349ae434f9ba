//! Bounded-concurrency batch reveal with progress reporting.

use crate::client::{envelope_from_failure, EnrichmentClient};
use rolodex_core::{ProgressCallback, ProgressEvent, ResponseEnvelope};
use rolodex_error::{ConfigError, QuotaError, QuotaErrorKind, RolodexResult};
use rolodex_interface::EnrichmentTransport;
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

/// Running counters shared by the concurrent tasks of one batch.
struct BatchTracker {
    completed: usize,
    successful: usize,
    failed: usize,
    recent_errors: VecDeque<String>,
    credits_used: u32,
    credits_remaining: Option<u32>,
}

impl BatchTracker {
    fn new() -> Self {
        Self {
            completed: 0,
            successful: 0,
            failed: 0,
            recent_errors: VecDeque::new(),
            credits_used: 0,
            credits_remaining: None,
        }
    }

    /// Fold one completed envelope into the counters.
    fn absorb(&mut self, envelope: &ResponseEnvelope) {
        self.completed += 1;
        if *envelope.success() {
            self.successful += 1;
        } else {
            self.failed += 1;
            if let Some(message) = envelope.error_message() {
                self.recent_errors.push_back(message.clone());
                while self.recent_errors.len() > 3 {
                    self.recent_errors.pop_front();
                }
            }
        }
        self.credits_used += *envelope.credits_used();
        if envelope.credits_remaining().is_some() {
            self.credits_remaining = *envelope.credits_remaining();
        }
    }

    fn event(&self, total: usize, elapsed_secs: f64) -> ProgressEvent {
        ProgressEvent::new(
            self.completed,
            total,
            self.successful,
            self.failed,
            elapsed_secs,
            self.recent_errors.iter().cloned().collect(),
            self.credits_used,
            self.credits_remaining,
        )
    }
}

impl<T: EnrichmentTransport> EnrichmentClient<T> {
    /// Reveal many subjects with bounded concurrency and progress events.
    ///
    /// Validates inputs (`batch_size > 0`, at most the hard API ceiling of
    /// subjects per call), prechecks account credits via
    /// [`check_credits`](Self::check_credits), and fails the whole batch
    /// before issuing any reveal when the known balance cannot cover it.
    ///
    /// Subjects are processed in sequential chunks of `batch_size`; inside a
    /// chunk, reveals fan out concurrently up to the configured
    /// `max_concurrency`. Chunk N+1 does not start until chunk N completes.
    /// Per-item quota and circuit failures become failed envelopes instead of
    /// aborting siblings. One progress event fires per completed item;
    /// callback panics are isolated and logged.
    ///
    /// The returned envelopes preserve input order by index, not completion
    /// order.
    #[instrument(skip(self, subject_ids, progress), fields(count = subject_ids.len(), batch_size))]
    pub async fn batch_reveal(
        &self,
        subject_ids: &[String],
        batch_size: usize,
        progress: Option<ProgressCallback>,
    ) -> RolodexResult<Vec<ResponseEnvelope>> {
        if batch_size == 0 {
            return Err(ConfigError::invalid("batch_size", "must be greater than zero").into());
        }
        if subject_ids.len() > self.config.batch_ceiling {
            return Err(ConfigError::new(format!(
                "{} subjects exceeds the per-call ceiling of {}; use the bulk export API for larger jobs",
                subject_ids.len(),
                self.config.batch_ceiling
            ))
            .into());
        }
        if subject_ids.is_empty() {
            return Ok(Vec::new());
        }

        // Credit precheck: abort the entire batch before any reveal call
        // when the known balance cannot cover it.
        let credit_envelope = self.check_credits().await?;
        if let Some(remaining) = Self::known_remaining(&credit_envelope) {
            if (remaining as usize) < subject_ids.len() {
                return Err(QuotaError::new(QuotaErrorKind::InsufficientAccountCredits {
                    needed: subject_ids.len() as u32,
                    remaining,
                })
                .into());
            }
        }

        let total = subject_ids.len();
        let started = Instant::now();
        let tracker = Mutex::new(BatchTracker::new());
        let mut results = Vec::with_capacity(total);

        for chunk in subject_ids.chunks(batch_size) {
            let chunk_futures = chunk.iter().map(|subject_id| {
                let tracker = &tracker;
                let progress = progress.as_ref();
                async move {
                    let _permit = self
                        .reveal_semaphore
                        .clone()
                        .acquire_owned()
                        .await
                        .expect("Semaphore should not be closed");

                    let envelope = match self.reveal(subject_id).await {
                        Ok(envelope) => envelope,
                        Err(error) => {
                            debug!(%subject_id, %error, "Reveal failed before transport, isolating");
                            envelope_from_failure(&error)
                        }
                    };

                    let event = {
                        let mut tracker = tracker.lock().await;
                        tracker.absorb(&envelope);
                        tracker.event(total, started.elapsed().as_secs_f64())
                    };
                    if let Some(callback) = progress {
                        emit_progress(callback, &event);
                    }
                    envelope
                }
            });

            // join_all preserves the order of the futures, giving
            // input-order results even though completion is unordered.
            let chunk_results = futures::future::join_all(chunk_futures).await;
            results.extend(chunk_results);
        }

        Ok(results)
    }
}

/// Invoke a progress callback, isolating panics from the batch.
fn emit_progress(callback: &ProgressCallback, event: &ProgressEvent) {
    if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
        warn!(
            current = event.current(),
            total = event.total(),
            "Progress callback panicked; continuing batch"
        );
    }
}
