//! Quota error types for daily credit and account balance exhaustion.

/// Quota-related error conditions.
///
/// Quota errors fail fast: waiting does not recover daily quota within the
/// same day, so none of these are retry candidates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum QuotaErrorKind {
    /// More credits were requested than remain in today's quota
    #[display("Insufficient daily credits: {} needed, {} remaining", needed, remaining)]
    InsufficientDailyCredits {
        /// Credits the request would consume
        needed: u32,
        /// Credits remaining in today's quota
        remaining: u32,
    },
    /// Today's credit quota is fully consumed
    #[display("Daily credit limit of {} exceeded", limit)]
    DailyLimitExceeded {
        /// The configured daily limit
        limit: u32,
    },
    /// The remote account does not hold enough credits for the operation
    #[display("Insufficient account credits: {} needed, {} remaining", needed, remaining)]
    InsufficientAccountCredits {
        /// Credits the operation would consume
        needed: u32,
        /// Credits reported remaining on the account
        remaining: u32,
    },
}

/// Quota error with source location tracking.
///
/// # Examples
///
/// ```
/// use rolodex_error::{QuotaError, QuotaErrorKind};
///
/// let err = QuotaError::new(QuotaErrorKind::DailyLimitExceeded { limit: 100 });
/// assert!(format!("{}", err).contains("Daily credit limit"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Quota Error: {} at line {} in {}", kind, line, file)]
pub struct QuotaError {
    /// The kind of error that occurred
    pub kind: QuotaErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl QuotaError {
    /// Create a new QuotaError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: QuotaErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
