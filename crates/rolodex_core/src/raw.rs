//! Raw transport result and quota-header extraction.
//!
//! The transport collaborator returns a [`RawHttpResult`] for every exchange
//! that produced an HTTP response, successful or not. This module only
//! extracts metadata from it; classification into success/failure happens in
//! [`crate::ResponseEnvelope`].
//!
//! Header extraction follows the quota-header contract: a numeric
//! `X-Credits-Left` header supersedes the JSON body's `credits_remaining`
//! field, and a `Retry-After` value on 429 responses is surfaced as an
//! advisory wait hint only.

use reqwest::header::HeaderMap;
use serde_json::Value;

/// Header carrying the account credit balance after a request.
pub const CREDITS_LEFT_HEADER: &str = "x-credits-left";

/// Response body as received, before any business interpretation.
#[derive(Debug, Clone, derive_more::From)]
pub enum RawBody {
    /// Body parsed as JSON
    Json(Value),
    /// Body kept as raw text (not valid JSON)
    Text(String),
}

/// Result of one HTTP exchange at the transport boundary.
///
/// # Example
///
/// ```
/// use reqwest::header::HeaderMap;
/// use rolodex_core::{RawBody, RawHttpResult};
///
/// let mut headers = HeaderMap::new();
/// headers.insert("X-Credits-Left", "41".parse().unwrap());
/// let raw = RawHttpResult::new(200, headers, RawBody::Json(serde_json::json!({})));
/// assert_eq!(raw.credits_remaining(), Some(41));
/// ```
#[derive(Debug, Clone)]
pub struct RawHttpResult {
    status_code: u16,
    headers: HeaderMap,
    body: RawBody,
}

impl RawHttpResult {
    /// Create a new raw result.
    pub fn new(status_code: u16, headers: HeaderMap, body: RawBody) -> Self {
        Self {
            status_code,
            headers,
            body,
        }
    }

    /// HTTP status code of the exchange.
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Response body.
    pub fn body(&self) -> &RawBody {
        &self.body
    }

    /// Whether the status code is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Body as a JSON object, if it parsed as one.
    pub fn json_object(&self) -> Option<&serde_json::Map<String, Value>> {
        match &self.body {
            RawBody::Json(Value::Object(map)) => Some(map),
            _ => None,
        }
    }

    /// Remaining account credits after this request.
    ///
    /// The `X-Credits-Left` header is authoritative when present and numeric;
    /// otherwise the body's `credits_remaining` field is used; absent both,
    /// returns `None`.
    pub fn credits_remaining(&self) -> Option<u32> {
        if let Some(from_header) = parse_header_u32(&self.headers, CREDITS_LEFT_HEADER) {
            return Some(from_header);
        }
        self.json_object()
            .and_then(|map| map.get("credits_remaining"))
            .and_then(Value::as_u64)
            .map(|v| v.min(u32::MAX as u64) as u32)
    }

    /// Advisory wait hint from a `Retry-After` header, in seconds.
    ///
    /// The value only enriches error messages; the retry strategy's own
    /// backoff governs actual wait time.
    pub fn retry_after_secs(&self) -> Option<u64> {
        parse_header_u64(&self.headers, "retry-after")
    }

    /// Best-effort human-readable message from an error body.
    ///
    /// Checks the conventional `error` and `message` JSON fields, then falls
    /// back to raw text, then to the bare status code.
    pub fn error_message(&self) -> String {
        if let Some(map) = self.json_object() {
            for key in ["error", "message", "detail"] {
                if let Some(Value::String(msg)) = map.get(key) {
                    return msg.clone();
                }
            }
        }
        match &self.body {
            RawBody::Text(text) if !text.trim().is_empty() => text.trim().to_string(),
            _ => format!("HTTP {}", self.status_code),
        }
    }
}

/// Helper to parse u32 from header value.
fn parse_header_u32(headers: &HeaderMap, key: &str) -> Option<u32> {
    headers.get(key)?.to_str().ok()?.trim().parse().ok()
}

/// Helper to parse u64 from header value.
fn parse_header_u64(headers: &HeaderMap, key: &str) -> Option<u64> {
    headers.get(key)?.to_str().ok()?.trim().parse().ok()
}
