//! Rate limiter implementation over a sliding request window and daily credits.
//!
//! The limiter tracks two quota views:
//! - a sliding 60-second window of request timestamps, pruned lazily on each
//!   check, which suspends callers when saturated instead of dropping them
//! - a rolling daily credit counter that resets lazily when the wall-clock
//!   date advances, and fails fast when exhausted (waiting cannot recover
//!   daily quota within the same day)
//!
//! The limiter is an explicit instance shared behind an async mutex; every
//! prune-then-append sequence runs as one critical section.

use crate::LimitsConfig;
use chrono::{Local, NaiveDate};
use rolodex_error::{QuotaError, QuotaErrorKind, RolodexResult};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

/// Width of the sliding request window.
const MINUTE_WINDOW: Duration = Duration::from_secs(60);

/// Usage severity relative to the daily credit quota.
///
/// Callers should log at `High`/`Critical` but must not block on this signal.
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
pub enum WarningLevel {
    /// Below half of the daily quota
    None,
    /// At least 50% of the daily quota consumed
    Moderate,
    /// At least 75% consumed
    High,
    /// At least 90% consumed
    Critical,
}

impl WarningLevel {
    /// Map a percentage of daily quota used to a warning level.
    pub fn from_percent(percent_used: f64) -> Self {
        if percent_used >= 90.0 {
            WarningLevel::Critical
        } else if percent_used >= 75.0 {
            WarningLevel::High
        } else if percent_used >= 50.0 {
            WarningLevel::Moderate
        } else {
            WarningLevel::None
        }
    }
}

/// Snapshot of daily quota usage returned by a successful admit.
#[derive(Debug, Clone, Serialize, Deserialize, derive_getters::Getters)]
pub struct QuotaStatus {
    /// Credits consumed today, including this admission
    used: u32,
    /// Daily credit limit
    limit: u32,
    /// Credits remaining today
    remaining: u32,
    /// used / limit as a percentage
    percent_used: f64,
    /// Severity of current usage
    warning_level: WarningLevel,
}

/// Internal limiter bookkeeping, guarded by one mutex.
struct LimiterState {
    /// Admission timestamps inside the sliding window, oldest first
    request_times: VecDeque<Instant>,
    /// Credits consumed since `day_start`
    daily_credits_used: u32,
    /// Wall-clock date the daily counter was last reset
    day_start: NaiveDate,
}

impl LimiterState {
    /// Reset the daily counter when the wall-clock date has advanced.
    fn roll_day(&mut self) {
        let today = Local::now().date_naive();
        if today != self.day_start {
            debug!(
                previous = %self.day_start,
                current = %today,
                "Daily quota window rolled over, resetting credit counter"
            );
            self.day_start = today;
            self.daily_credits_used = 0;
        }
    }

    /// Drop timestamps that have left the sliding window.
    fn prune(&mut self, now: Instant) {
        while let Some(oldest) = self.request_times.front() {
            if now.duration_since(*oldest) >= MINUTE_WINDOW {
                self.request_times.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Admission control over per-minute requests and daily credits.
///
/// `admit` gates each request: daily quota exhaustion fails fast with a
/// [`QuotaError`], while per-minute saturation suspends the caller until the
/// oldest timestamp exits the window, then proceeds. Requests are never
/// dropped by the minute window.
///
/// # Example
///
/// ```rust,ignore
/// use rolodex_rate_limit::RateLimiter;
///
/// let limiter = RateLimiter::new(60, 5000);
/// let status = limiter.admit(1).await?;
/// if *status.percent_used() >= 75.0 {
///     tracing::warn!("daily quota at {:.0}%", status.percent_used());
/// }
/// ```
pub struct RateLimiter {
    max_requests_per_minute: u32,
    daily_credit_limit: u32,
    state: Mutex<LimiterState>,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("max_requests_per_minute", &self.max_requests_per_minute)
            .field("daily_credit_limit", &self.daily_credit_limit)
            .finish_non_exhaustive()
    }
}

impl RateLimiter {
    /// Create a limiter with explicit per-minute and daily limits.
    ///
    /// A per-minute limit of zero is clamped to one; the window must admit
    /// something eventually or callers would suspend forever.
    pub fn new(max_requests_per_minute: u32, daily_credit_limit: u32) -> Self {
        Self {
            max_requests_per_minute: max_requests_per_minute.max(1),
            daily_credit_limit,
            state: Mutex::new(LimiterState {
                request_times: VecDeque::new(),
                daily_credits_used: 0,
                day_start: Local::now().date_naive(),
            }),
        }
    }

    /// Create a limiter from a limits configuration section.
    pub fn from_config(limits: &LimitsConfig) -> Self {
        Self::new(limits.requests_per_minute, limits.daily_credit_limit)
    }

    /// Admit one request that will consume `credits_needed` daily credits.
    ///
    /// Daily checks run before any waiting: if the daily quota is fully
    /// consumed the call fails with `DailyLimitExceeded`; if the request does
    /// not fit in what remains it fails with `InsufficientDailyCredits`.
    /// Neither is recoverable by waiting within the same day. Per-minute
    /// saturation suspends until the oldest timestamp ages out of the
    /// 60-second window.
    ///
    /// On success the timestamp is appended, the daily counter advances by
    /// `credits_needed`, and a [`QuotaStatus`] snapshot is returned.
    #[instrument(skip(self))]
    pub async fn admit(&self, credits_needed: u32) -> RolodexResult<QuotaStatus> {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                state.roll_day();

                if state.daily_credits_used >= self.daily_credit_limit {
                    return Err(QuotaError::new(QuotaErrorKind::DailyLimitExceeded {
                        limit: self.daily_credit_limit,
                    })
                    .into());
                }
                let remaining_daily = self.daily_credit_limit - state.daily_credits_used;
                if credits_needed > remaining_daily {
                    return Err(QuotaError::new(QuotaErrorKind::InsufficientDailyCredits {
                        needed: credits_needed,
                        remaining: remaining_daily,
                    })
                    .into());
                }

                let now = Instant::now();
                state.prune(now);

                if (state.request_times.len() as u32) < self.max_requests_per_minute {
                    state.request_times.push_back(now);
                    state.daily_credits_used += credits_needed;
                    let status = self.status_snapshot(&state);
                    match status.warning_level {
                        WarningLevel::High | WarningLevel::Critical => warn!(
                            used = status.used,
                            limit = status.limit,
                            level = %status.warning_level,
                            "Daily credit usage nearing limit"
                        ),
                        _ => {}
                    }
                    return Ok(status);
                }

                // Window saturated: wait until the oldest admission ages out.
                state
                    .request_times
                    .front()
                    .map(|oldest| MINUTE_WINDOW.saturating_sub(now.duration_since(*oldest)))
            };

            if let Some(delay) = wait {
                debug!(delay_ms = delay.as_millis() as u64, "Request window full, suspending");
                tokio::time::sleep(delay).await;
            }
        }
    }

    /// Requests currently inside the sliding minute window.
    pub async fn minute_usage(&self) -> u32 {
        let mut state = self.state.lock().await;
        state.prune(Instant::now());
        state.request_times.len() as u32
    }

    /// Daily credit usage as `(used, limit)`, after a lazy date check.
    pub async fn daily_usage(&self) -> (u32, u32) {
        let mut state = self.state.lock().await;
        state.roll_day();
        (state.daily_credits_used, self.daily_credit_limit)
    }

    /// Daily quota snapshot without admitting anything.
    pub async fn quota_status(&self) -> QuotaStatus {
        let mut state = self.state.lock().await;
        state.roll_day();
        self.status_snapshot(&state)
    }

    fn status_snapshot(&self, state: &LimiterState) -> QuotaStatus {
        let used = state.daily_credits_used;
        let limit = self.daily_credit_limit;
        let percent_used = if limit > 0 {
            used as f64 / limit as f64 * 100.0
        } else {
            0.0
        };
        QuotaStatus {
            used,
            limit,
            remaining: limit.saturating_sub(used),
            percent_used,
            warning_level: WarningLevel::from_percent(percent_used),
        }
    }
}
