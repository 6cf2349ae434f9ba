//! Rate limiting and retry strategy for the rolodex client.
//!
//! This crate provides the request-admission runtime: a [`RateLimiter`] that
//! gates requests against a sliding per-minute window and a rolling daily
//! credit quota, and a [`RetryStrategy`] that classifies failures, computes
//! jittered exponential backoff, and trips a circuit breaker over repeated
//! failures.
//!
//! Both are explicit instances owned by the orchestrator, never module-level
//! globals, so independent limiter instances can run side by side in tests.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod limiter;
mod retry;

pub use config::{ClientConfig, LimitsConfig, QueueConfig, RolodexConfig};
pub use limiter::{QuotaStatus, RateLimiter, WarningLevel};
pub use retry::{ErrorClass, RetryPolicy, RetryStats, RetryStrategy};
