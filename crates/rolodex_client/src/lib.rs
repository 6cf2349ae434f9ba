//! Client orchestrator for the rolodex contact-enrichment API.
//!
//! [`EnrichmentClient`] composes the rate limiter, retry strategy, and batch
//! queue into the caller-facing operations: a TTL-cached credit check, single
//! reveal-with-retry, bounded-concurrency batch reveal with progress
//! reporting, search with its own concurrency cap, and queue-driven batch
//! processing loops.
//!
//! The production transport is [`HttpTransport`]; tests substitute any
//! [`rolodex_interface::EnrichmentTransport`] implementation.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod batch;
mod client;
mod queue_runner;
mod transport;

pub use client::EnrichmentClient;
pub use queue_runner::{QueueBatchResult, QueueRunSummary, StopReason};
pub use transport::HttpTransport;

// Convenience re-exports so most callers need only this crate.
pub use rolodex_core::{ProgressCallback, ProgressEvent, RawBody, RawHttpResult, ResponseEnvelope};
pub use rolodex_interface::{EnrichmentTransport, Method};
pub use rolodex_queue::{BatchQueue, Priority, QueueItem, QueueStats};
pub use rolodex_rate_limit::{
    QuotaStatus, RateLimiter, RetryPolicy, RetryStats, RetryStrategy, RolodexConfig, WarningLevel,
};
