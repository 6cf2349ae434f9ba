//! Uniform result envelope for enrichment operations.

use crate::RawHttpResult;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Uniform result of one reveal or search operation.
///
/// Every operation yields exactly one envelope, success or failure, so batch
/// callers can enumerate which subjects failed and why. The envelope is
/// immutable once constructed; `success == true` implies no error message.
///
/// # Examples
///
/// ```
/// use rolodex_core::ResponseEnvelope;
///
/// let ok = ResponseEnvelope::ok(None, 1, Some(99));
/// assert!(ok.success());
/// assert!(ok.error_message().is_none());
///
/// let failed = ResponseEnvelope::err("not found", Some(404));
/// assert!(!failed.success());
/// assert_eq!(*failed.credits_used(), 0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, derive_getters::Getters)]
pub struct ResponseEnvelope {
    /// Whether the operation succeeded
    success: bool,
    /// Business payload of a successful response
    payload: Option<Map<String, Value>>,
    /// Human-readable failure description
    error_message: Option<String>,
    /// HTTP status code, where one was observed or derivable
    status_code: Option<u16>,
    /// Credits consumed by this operation
    credits_used: u32,
    /// Account credits remaining, when the service reported them
    credits_remaining: Option<u32>,
}

impl ResponseEnvelope {
    /// Construct a successful envelope.
    pub fn ok(
        payload: Option<Map<String, Value>>,
        credits_used: u32,
        credits_remaining: Option<u32>,
    ) -> Self {
        Self {
            success: true,
            payload,
            error_message: None,
            status_code: Some(200),
            credits_used,
            credits_remaining,
        }
    }

    /// Construct a failed envelope. Failures never consume credits.
    pub fn err(message: impl Into<String>, status_code: Option<u16>) -> Self {
        Self {
            success: false,
            payload: None,
            error_message: Some(message.into()),
            status_code,
            credits_used: 0,
            credits_remaining: None,
        }
    }

    /// Attach a remaining-credit count to a failed envelope.
    ///
    /// Error responses still carry the `X-Credits-Left` header on some
    /// endpoints.
    pub fn with_credits_remaining(mut self, credits_remaining: Option<u32>) -> Self {
        self.credits_remaining = credits_remaining;
        self
    }

    /// Classify a raw transport result into an envelope.
    ///
    /// Applies the quota-header contract (header supersedes body field) and
    /// the status-code special cases:
    /// - `429` enriches the message with the `Retry-After` advisory hint
    /// - `402` maps to an insufficient-account-credits message
    /// - `403` distinguishes API-key errors by the "api" substring
    ///
    /// `default_credits` is the cost attributed to a success when the body
    /// does not carry its own `credits_used` field (one per reveal, zero for
    /// searches).
    pub fn from_raw(raw: &RawHttpResult, default_credits: u32) -> Self {
        let credits_remaining = raw.credits_remaining();

        if raw.is_success() {
            let payload = raw.json_object().cloned();
            let credits_used = payload
                .as_ref()
                .and_then(|map| map.get("credits_used"))
                .and_then(Value::as_u64)
                .map(|v| v.min(u32::MAX as u64) as u32)
                .unwrap_or(default_credits);
            return Self {
                success: true,
                payload,
                error_message: None,
                status_code: Some(raw.status_code()),
                credits_used,
                credits_remaining,
            };
        }

        let base = raw.error_message();
        let message = match raw.status_code() {
            429 => match raw.retry_after_secs() {
                Some(secs) => format!("Rate limited: {} (retry after ~{}s)", base, secs),
                None => format!("Rate limited: {}", base),
            },
            402 => format!("Insufficient account credits: {}", base),
            403 if base.to_lowercase().contains("api") => {
                format!("API key or permission error: {}", base)
            }
            _ => base,
        };

        Self {
            success: false,
            payload: None,
            error_message: Some(message),
            status_code: Some(raw.status_code()),
            credits_used: 0,
            credits_remaining,
        }
    }
}
