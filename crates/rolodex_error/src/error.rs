//! Top-level error wrapper types.

use crate::{CircuitOpenError, ConfigError, QuotaError, TransportError};

/// Union of all error conditions surfaced by the rolodex client.
///
/// # Examples
///
/// ```
/// use rolodex_error::{RolodexError, TransportError, TransportErrorKind};
///
/// let transport_err = TransportError::new(TransportErrorKind::Connection(
///     "connection refused".to_string(),
/// ));
/// let err: RolodexError = transport_err.into();
/// assert!(format!("{}", err).contains("Transport Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum RolodexErrorKind {
    /// Transport-level failure (timeout, connection, HTTP status)
    #[from(TransportError)]
    Transport(TransportError),
    /// Daily or account credit quota exhausted
    #[from(QuotaError)]
    Quota(QuotaError),
    /// Circuit breaker is open
    #[from(CircuitOpenError)]
    CircuitOpen(CircuitOpenError),
    /// Invalid configuration or input
    #[from(ConfigError)]
    Config(ConfigError),
}

/// Rolodex error with kind discrimination.
///
/// # Examples
///
/// ```
/// use rolodex_error::{ConfigError, RolodexResult};
///
/// fn might_fail() -> RolodexResult<()> {
///     Err(ConfigError::new("missing base URL"))?
/// }
///
/// match might_fail() {
///     Ok(_) => println!("Success"),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Rolodex Error: {}", _0)]
pub struct RolodexError(Box<RolodexErrorKind>);

impl RolodexError {
    /// Create a new error from a kind.
    pub fn new(kind: RolodexErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &RolodexErrorKind {
        &self.0
    }
}

// Generic From implementation for any type that converts to RolodexErrorKind
impl<T> From<T> for RolodexError
where
    T: Into<RolodexErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for rolodex operations.
///
/// # Examples
///
/// ```
/// use rolodex_error::{CircuitOpenError, RolodexResult};
///
/// fn reveal() -> RolodexResult<String> {
///     Err(CircuitOpenError::new(60))?
/// }
/// ```
pub type RolodexResult<T> = std::result::Result<T, RolodexError>;
