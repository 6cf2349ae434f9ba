//! Transport-level error types and retry eligibility.

/// Transport-level error conditions.
///
/// These cover everything that can go wrong between issuing a request and
/// receiving a well-formed response: network faults, timeouts, and HTTP
/// error statuses from the enrichment service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum TransportErrorKind {
    /// Request timed out before a response arrived
    #[display("Request timed out: {}", _0)]
    Timeout(String),
    /// Connection-level failure (refused, reset, DNS)
    #[display("Connection failed: {}", _0)]
    Connection(String),
    /// Response body could not be parsed
    #[display("Malformed response body: {}", _0)]
    MalformedBody(String),
    /// HTTP error with status code and message
    #[display("HTTP {} error: {}", status_code, message)]
    HttpError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the response
        message: String,
    },
    /// Request could not be constructed or sent
    #[display("Request failed: {}", _0)]
    Request(String),
}

impl TransportErrorKind {
    /// Check if this error condition should be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportErrorKind::HttpError { status_code, .. } => {
                matches!(*status_code, 408 | 429 | 500 | 502 | 503 | 504)
            }
            TransportErrorKind::Timeout(_) => true,
            TransportErrorKind::Connection(_) => true,
            TransportErrorKind::MalformedBody(_) => false,
            TransportErrorKind::Request(_) => false,
        }
    }

    /// Status code hint for this error, where one is derivable.
    ///
    /// Network-level faults map onto conventional status codes (e.g. a
    /// timeout reports as 408) so callers can classify them uniformly.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            TransportErrorKind::HttpError { status_code, .. } => Some(*status_code),
            TransportErrorKind::Timeout(_) => Some(408),
            _ => None,
        }
    }
}

/// Transport error with source location tracking.
///
/// # Examples
///
/// ```
/// use rolodex_error::{TransportError, TransportErrorKind};
///
/// let err = TransportError::new(TransportErrorKind::Timeout("30s elapsed".to_string()));
/// assert!(format!("{}", err).contains("timed out"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Transport Error: {} at line {} in {}", kind, line, file)]
pub struct TransportError {
    /// The kind of error that occurred
    pub kind: TransportErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl TransportError {
    /// Create a new TransportError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: TransportErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

/// Trait for errors that support retry logic.
///
/// Transient errors like 503 (service unavailable), 429 (rate limit), or
/// network timeouts should return true. Permanent errors like 401
/// (unauthorized) or 404 (not found) should return false.
///
/// # Examples
///
/// ```
/// use rolodex_error::{RetryableError, TransportError, TransportErrorKind};
///
/// let err = TransportError::new(TransportErrorKind::HttpError {
///     status_code: 503,
///     message: "Service unavailable".to_string(),
/// });
/// assert!(err.is_retryable());
/// ```
pub trait RetryableError {
    /// Returns true if this error should trigger a retry.
    fn is_retryable(&self) -> bool;
}

impl RetryableError for TransportError {
    fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}
