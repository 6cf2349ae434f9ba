//! The client orchestrator: credit check, reveal, and search with retry.

use rolodex_core::ResponseEnvelope;
use rolodex_error::{CircuitOpenError, RolodexError, RolodexErrorKind, RolodexResult};
use rolodex_interface::{EnrichmentTransport, Method};
use rolodex_queue::{BatchQueue, Priority, QueueStats};
use rolodex_rate_limit::{
    ClientConfig, QuotaStatus, RateLimiter, RetryStats, RetryStrategy, RolodexConfig,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Cached result of the last successful credit check.
struct CreditCacheEntry {
    envelope: ResponseEnvelope,
    fetched_at: Instant,
}

impl CreditCacheEntry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() > ttl
    }
}

/// Orchestrator for the contact-enrichment API.
///
/// Composes the rate limiter, retry strategy, and batch queue around an
/// abstract transport. All shared state (limiter window, circuit breaker,
/// queue, credit cache) lives in explicit instances owned by this struct, so
/// independent clients can run side by side.
///
/// # Example
///
/// ```rust,ignore
/// use rolodex_client::{EnrichmentClient, HttpTransport};
/// use rolodex_rate_limit::RolodexConfig;
///
/// let config = RolodexConfig::load()?;
/// let transport = HttpTransport::from_config(&config.client, &api_key)?;
/// let client = EnrichmentClient::new(transport, config);
///
/// let envelope = client.reveal("subject-123").await?;
/// ```
pub struct EnrichmentClient<T: EnrichmentTransport> {
    pub(crate) transport: T,
    pub(crate) limiter: RateLimiter,
    pub(crate) retry: RetryStrategy,
    pub(crate) queue: Mutex<BatchQueue>,
    pub(crate) reveal_semaphore: Arc<Semaphore>,
    pub(crate) search_semaphore: Arc<Semaphore>,
    pub(crate) config: ClientConfig,
    credit_cache: Mutex<Option<CreditCacheEntry>>,
    credit_cache_ttl: Duration,
}

impl<T: EnrichmentTransport> std::fmt::Debug for EnrichmentClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrichmentClient")
            .field("limiter", &self.limiter)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl<T: EnrichmentTransport> EnrichmentClient<T> {
    /// Create a client from a transport and the full configuration.
    pub fn new(transport: T, config: RolodexConfig) -> Self {
        let RolodexConfig {
            limits,
            retry,
            queue,
            client,
        } = config;

        Self {
            transport,
            limiter: RateLimiter::from_config(&limits),
            retry: RetryStrategy::new(retry),
            queue: Mutex::new(BatchQueue::new(queue.daily_limit, queue.max_retries)),
            reveal_semaphore: Arc::new(Semaphore::new(limits.max_concurrency.max(1) as usize)),
            search_semaphore: Arc::new(Semaphore::new(limits.search_concurrency.max(1) as usize)),
            credit_cache_ttl: Duration::from_secs(client.credit_cache_ttl_secs),
            config: client,
            credit_cache: Mutex::new(None),
        }
    }

    /// Resolve one opaque subject identifier to contact details.
    ///
    /// Fails fast with [`CircuitOpenError`] while the breaker is open and
    /// with a quota error when the daily credit budget cannot cover the
    /// call; neither consumes a retry attempt. Transport and HTTP failures
    /// come back as failed envelopes after the retry budget is spent.
    #[instrument(skip(self))]
    pub async fn reveal(&self, subject_id: &str) -> RolodexResult<ResponseEnvelope> {
        self.call_with_retry(
            Method::Post,
            "reveal",
            Some(json!({ "subject_id": subject_id })),
            1,
            true,
        )
        .await
    }

    /// Run a search query against the enrichment service.
    ///
    /// Searches are serialized by their own, smaller semaphore because the
    /// upstream service imposes a stricter concurrent-request ceiling for
    /// search; reveal concurrency is never throttled by it. Searches occupy
    /// a minute-window slot but consume no daily credits.
    #[instrument(skip(self, query))]
    pub async fn search(&self, query: Value) -> RolodexResult<ResponseEnvelope> {
        let _permit = self
            .search_semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("Semaphore should not be closed");
        self.call_with_retry(Method::Post, "search", Some(query), 0, true)
            .await
    }

    /// Check the account's credit balance, with a TTL cache.
    ///
    /// Successful responses are cached for the configured TTL (300s by
    /// default); failed responses are never cached. Use
    /// [`invalidate_credit_cache`](Self::invalidate_credit_cache) to force a
    /// fresh check.
    #[instrument(skip(self))]
    pub async fn check_credits(&self) -> RolodexResult<ResponseEnvelope> {
        {
            let cache = self.credit_cache.lock().await;
            if let Some(entry) = cache.as_ref() {
                if !entry.is_expired(self.credit_cache_ttl) {
                    debug!("Serving credit check from cache");
                    return Ok(entry.envelope.clone());
                }
            }
        }

        // The credit check exists to avoid wasting quota, so it is not
        // itself gated by admission.
        let envelope = self
            .call_with_retry(Method::Get, "credits", None, 0, false)
            .await?;
        if *envelope.success() {
            let mut cache = self.credit_cache.lock().await;
            *cache = Some(CreditCacheEntry {
                envelope: envelope.clone(),
                fetched_at: Instant::now(),
            });
        }
        Ok(envelope)
    }

    /// Drop the cached credit check.
    pub async fn invalidate_credit_cache(&self) {
        *self.credit_cache.lock().await = None;
    }

    /// Enqueue one subject for queue-driven processing.
    pub async fn enqueue(
        &self,
        subject_id: impl Into<String> + std::fmt::Debug,
        priority: Priority,
        metadata: HashMap<String, Value>,
    ) -> Uuid {
        self.queue.lock().await.enqueue(subject_id, priority, metadata)
    }

    /// Enqueue many subjects with a shared priority and metadata.
    pub async fn enqueue_many(
        &self,
        subject_ids: impl IntoIterator<Item = impl Into<String> + std::fmt::Debug>,
        priority: Priority,
        metadata: HashMap<String, Value>,
    ) -> Vec<Uuid> {
        self.queue
            .lock()
            .await
            .enqueue_many(subject_ids, priority, metadata)
    }

    /// Current queue counts.
    pub async fn queue_stats(&self) -> QueueStats {
        self.queue.lock().await.stats()
    }

    /// Reclaim memory held by completed queue items.
    pub async fn clear_completed(&self) -> usize {
        self.queue.lock().await.clear_completed()
    }

    /// Retry and circuit breaker statistics.
    pub fn retry_stats(&self) -> RetryStats {
        self.retry.stats()
    }

    /// Daily quota snapshot from the rate limiter.
    pub async fn quota_status(&self) -> QuotaStatus {
        self.limiter.quota_status().await
    }

    /// Remaining account credits from a credit-check envelope, if reported.
    pub(crate) fn known_remaining(envelope: &ResponseEnvelope) -> Option<u32> {
        if let Some(remaining) = envelope.credits_remaining() {
            return Some(*remaining);
        }
        let payload = envelope.payload().as_ref()?;
        for key in ["credits_remaining", "credits", "credits_left"] {
            if let Some(value) = payload.get(key).and_then(Value::as_u64) {
                return Some(value.min(u32::MAX as u64) as u32);
            }
        }
        None
    }

    /// One admission-gated, retried exchange with the service.
    ///
    /// Per attempt: the circuit is checked *before* any transport work, the
    /// rate limiter admits the request (quota errors propagate untouched),
    /// the transport runs, the outcome is recorded, and the retry strategy
    /// decides between returning and backing off.
    pub(crate) async fn call_with_retry(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        credits: u32,
        gated: bool,
    ) -> RolodexResult<ResponseEnvelope> {
        let mut attempt: u32 = 0;
        loop {
            if self.retry.circuit_open() {
                return Err(CircuitOpenError::new(self.retry.circuit_retry_in_secs()).into());
            }

            if gated {
                self.limiter.admit(credits).await?;
            }

            let envelope = match self.transport.execute(method, path, body.clone()).await {
                Ok(raw) => ResponseEnvelope::from_raw(&raw, credits),
                Err(error) => match error.kind() {
                    // Network-level faults recover locally via retry.
                    RolodexErrorKind::Transport(transport_error) => ResponseEnvelope::err(
                        transport_error.kind.to_string(),
                        transport_error.kind.status_code(),
                    ),
                    _ => return Err(error),
                },
            };

            self.retry.record(
                *envelope.success(),
                *envelope.status_code(),
                envelope.error_message().as_deref(),
            );

            if *envelope.success() {
                return Ok(envelope);
            }

            let status_code = *envelope.status_code();
            let message = envelope.error_message().clone();
            if self
                .retry
                .should_retry(attempt, status_code, message.as_deref())
            {
                let delay = self.retry.next_delay(attempt);
                warn!(
                    attempt,
                    ?status_code,
                    delay_ms = delay.as_millis() as u64,
                    "Transient failure, backing off before retry"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            debug!(attempt, ?status_code, "Failure not retryable, surfacing envelope");
            return Ok(envelope);
        }
    }
}

/// Convert a typed error into a failed envelope for per-item isolation.
///
/// Batch processing returns one envelope per input even when an item hits a
/// quota or circuit failure before any transport call; those failures consume
/// zero credits.
pub(crate) fn envelope_from_failure(error: &RolodexError) -> ResponseEnvelope {
    match error.kind() {
        RolodexErrorKind::Transport(transport_error) => ResponseEnvelope::err(
            transport_error.kind.to_string(),
            transport_error.kind.status_code(),
        ),
        RolodexErrorKind::Quota(quota_error) => {
            ResponseEnvelope::err(quota_error.kind.to_string(), None)
        }
        RolodexErrorKind::CircuitOpen(circuit_error) => {
            ResponseEnvelope::err(circuit_error.to_string(), None)
        }
        RolodexErrorKind::Config(config_error) => {
            ResponseEnvelope::err(config_error.kind.to_string(), None)
        }
    }
}
