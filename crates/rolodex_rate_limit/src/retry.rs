//! Retry strategy: failure classification, backoff, and circuit breaking.
//!
//! Classification prefers structured status codes; message-substring matching
//! is a fallback tier only, isolated behind [`RetryStrategy::classify`] so it
//! can be swapped for a stricter structured contract if the upstream API is
//! redesigned.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Delays never drop below this floor, jitter included.
const MIN_DELAY: Duration = Duration::from_millis(100);

/// Classification of a failed outcome.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
#[strum(serialize_all = "lowercase")]
pub enum ErrorClass {
    /// Temporary condition worth retrying (timeouts, 429, 5xx, network)
    Transient,
    /// Caller-side error, never retried (4xx other than 408/429)
    Client,
    /// Server-side error (5xx); retried like transient
    Server,
    /// Unclassifiable; retried conservatively
    Unknown,
}

/// Tunable retry and circuit breaker parameters.
///
/// Defaults mirror the service's documented guidance: 3 retries starting at
/// 250ms with a 2x factor capped at 30s, ±10% jitter, and a breaker that
/// opens after 5 consecutive failures for 60s. All values are tunable, not
/// hard invariants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum retry attempts after the initial call
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base backoff delay in milliseconds
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Backoff cap in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Geometric growth factor per attempt
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
    /// Uniform jitter proportion applied to each delay (0.1 = ±10%)
    #[serde(default = "default_jitter_range")]
    pub jitter_range: f64,
    /// Consecutive failures before the circuit opens
    #[serde(default = "default_circuit_threshold")]
    pub circuit_breaker_threshold: u32,
    /// Seconds the circuit stays open after the last failure
    #[serde(default = "default_circuit_timeout_secs")]
    pub circuit_timeout_secs: u64,
}

fn default_max_retries() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    250
}
fn default_max_delay_ms() -> u64 {
    30_000
}
fn default_backoff_factor() -> f64 {
    2.0
}
fn default_jitter_range() -> f64 {
    0.1
}
fn default_circuit_threshold() -> u32 {
    5
}
fn default_circuit_timeout_secs() -> u64 {
    60
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_factor: default_backoff_factor(),
            jitter_range: default_jitter_range(),
            circuit_breaker_threshold: default_circuit_threshold(),
            circuit_timeout_secs: default_circuit_timeout_secs(),
        }
    }
}

impl RetryPolicy {
    /// Circuit cooldown as a duration.
    pub fn circuit_timeout(&self) -> Duration {
        Duration::from_secs(self.circuit_timeout_secs)
    }
}

/// Counters accumulated across recorded attempts.
#[derive(Debug, Clone, Default, Serialize, Deserialize, derive_getters::Getters)]
pub struct RetryStats {
    /// Attempts recorded, successes and failures alike
    attempts: u64,
    /// Successful attempts
    successes: u64,
    /// Failed attempts
    failures: u64,
    /// Successes that landed after one or more consecutive failures
    successful_retries: u64,
    /// Times the circuit breaker opened
    circuit_trips: u64,
    /// Failure counts per classification
    errors_by_class: HashMap<ErrorClass, u64>,
}

/// Circuit breaker bookkeeping.
struct CircuitState {
    consecutive_failures: u32,
    last_failure: Option<Instant>,
    circuit_open: bool,
    stats: RetryStats,
}

/// Retry decision engine with a circuit breaker.
///
/// The strategy owns no I/O: callers ask [`should_retry`](Self::should_retry)
/// whether another attempt is worthwhile, [`next_delay`](Self::next_delay)
/// how long to back off, and report every outcome through
/// [`record`](Self::record). The orchestrator checks
/// [`circuit_open`](Self::circuit_open) *before* issuing a transport call,
/// not only before retrying.
pub struct RetryStrategy {
    policy: RetryPolicy,
    state: Mutex<CircuitState>,
}

impl std::fmt::Debug for RetryStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryStrategy")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl RetryStrategy {
    /// Create a strategy from a policy.
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            state: Mutex::new(CircuitState {
                consecutive_failures: 0,
                last_failure: None,
                circuit_open: false,
                stats: RetryStats::default(),
            }),
        }
    }

    /// The policy this strategy was built with.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Classify an outcome by status code, falling back to message substrings.
    ///
    /// Statuses in {408, 429, 500, 502, 503, 504} are transient (transient
    /// takes precedence over the overlapping server class); {400, 401, 403,
    /// 404, 422} are client errors. Without a usable status, the message is
    /// scanned for network-ish substrings (transient) or authorization-ish
    /// substrings (client); anything else is unknown.
    pub fn classify(status_code: Option<u16>, message: Option<&str>) -> ErrorClass {
        match status_code {
            Some(408 | 429 | 500 | 502 | 503 | 504) => return ErrorClass::Transient,
            Some(400 | 401 | 403 | 404 | 422) => return ErrorClass::Client,
            Some(code) if (500..600).contains(&code) => return ErrorClass::Server,
            _ => {}
        }

        if let Some(message) = message {
            let lower = message.to_lowercase();
            if ["timeout", "connection", "network", "rate limit"]
                .iter()
                .any(|s| lower.contains(s))
            {
                return ErrorClass::Transient;
            }
            if ["unauthorized", "forbidden", "not found"]
                .iter()
                .any(|s| lower.contains(s))
            {
                return ErrorClass::Client;
            }
        }
        ErrorClass::Unknown
    }

    /// Decide whether attempt `attempt` (zero-based) should be retried.
    ///
    /// Returns false while the circuit is open, once the retry ceiling is
    /// reached, and always for client-classified errors. Unknown outcomes are
    /// retried only while `attempt < 2`.
    pub fn should_retry(&self, attempt: u32, status_code: Option<u16>, message: Option<&str>) -> bool {
        if self.circuit_open() {
            return false;
        }
        if attempt >= self.policy.max_retries {
            return false;
        }
        match Self::classify(status_code, message) {
            ErrorClass::Client => false,
            ErrorClass::Transient | ErrorClass::Server => true,
            ErrorClass::Unknown => attempt < 2,
        }
    }

    /// Backoff before retrying attempt `attempt` (zero-based).
    ///
    /// Exponential `base * factor^attempt`, capped at the policy maximum,
    /// perturbed by uniform jitter in `±jitter_range`, floored at 100ms.
    /// The cap holds after jitter.
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let base = self.policy.base_delay_ms as f64
            * self.policy.backoff_factor.powi(attempt.min(64) as i32);
        let capped = base.min(self.policy.max_delay_ms as f64);

        let jitter = self.policy.jitter_range.abs();
        let factor = if jitter > 0.0 {
            1.0 + rand::thread_rng().gen_range(-jitter..=jitter)
        } else {
            1.0
        };

        let max = self.policy.max_delay_ms as f64;
        let floor = (MIN_DELAY.as_millis() as f64).min(max);
        let millis = (capped * factor).clamp(floor, max);
        Duration::from_millis(millis as u64)
    }

    /// Record an attempt's outcome, updating circuit state and stats.
    ///
    /// A failure increments the consecutive-failure count and opens the
    /// circuit at the configured threshold. A success closes the circuit and
    /// resets the count; if failures preceded it, it also counts as a
    /// successful retry.
    pub fn record(&self, success: bool, status_code: Option<u16>, message: Option<&str>) {
        let mut state = self.lock_state();
        state.stats.attempts += 1;

        if success {
            state.stats.successes += 1;
            if state.consecutive_failures > 0 {
                state.stats.successful_retries += 1;
            }
            state.consecutive_failures = 0;
            if state.circuit_open {
                debug!("Circuit breaker closed after successful call");
            }
            state.circuit_open = false;
            return;
        }

        state.stats.failures += 1;
        let class = Self::classify(status_code, message);
        *state.stats.errors_by_class.entry(class).or_default() += 1;
        state.consecutive_failures += 1;
        state.last_failure = Some(Instant::now());

        if state.consecutive_failures >= self.policy.circuit_breaker_threshold
            && !state.circuit_open
        {
            state.circuit_open = true;
            state.stats.circuit_trips += 1;
            warn!(
                consecutive_failures = state.consecutive_failures,
                timeout_secs = self.policy.circuit_timeout_secs,
                "Circuit breaker opened"
            );
        }
    }

    /// Whether the circuit is currently open.
    ///
    /// Transitions to closed exactly once the cooldown has elapsed since the
    /// last recorded failure.
    pub fn circuit_open(&self) -> bool {
        let mut state = self.lock_state();
        if state.circuit_open {
            let elapsed_cooldown = state
                .last_failure
                .map(|at| at.elapsed() >= self.policy.circuit_timeout())
                .unwrap_or(true);
            if elapsed_cooldown {
                debug!("Circuit breaker cooldown elapsed, closing");
                state.circuit_open = false;
            }
        }
        state.circuit_open
    }

    /// Seconds until the open circuit's cooldown elapses, zero when closed.
    pub fn circuit_retry_in_secs(&self) -> u64 {
        let state = self.lock_state();
        if !state.circuit_open {
            return 0;
        }
        state
            .last_failure
            .map(|at| {
                self.policy
                    .circuit_timeout()
                    .saturating_sub(at.elapsed())
                    .as_secs()
            })
            .unwrap_or(0)
    }

    /// Snapshot of accumulated stats.
    pub fn stats(&self) -> RetryStats {
        self.lock_state().stats.clone()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, CircuitState> {
        // Mutex poisoning only happens if a holder panicked; the bookkeeping
        // is still structurally sound, so recover the guard.
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
