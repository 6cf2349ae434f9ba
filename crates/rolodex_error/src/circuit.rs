//! Circuit breaker error type.

/// Error returned when the circuit breaker is open.
///
/// While the breaker is open the client fails fast instead of issuing
/// transport calls. The error carries the remaining cooldown so callers can
/// schedule a retry after it elapses.
///
/// # Examples
///
/// ```
/// use rolodex_error::CircuitOpenError;
///
/// let err = CircuitOpenError::new(42);
/// assert!(format!("{}", err).contains("42s"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display(
    "Circuit breaker open: failing fast, retry in {}s (at line {} in {})",
    retry_in_secs,
    line,
    file
)]
pub struct CircuitOpenError {
    /// Seconds until the breaker cooldown elapses
    pub retry_in_secs: u64,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl CircuitOpenError {
    /// Create a new CircuitOpenError with automatic location tracking.
    #[track_caller]
    pub fn new(retry_in_secs: u64) -> Self {
        let location = std::panic::Location::caller();
        Self {
            retry_in_secs,
            line: location.line(),
            file: location.file(),
        }
    }
}
