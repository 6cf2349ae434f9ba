//! Configuration error types.

/// Configuration error conditions.
///
/// Raised synchronously before any network activity: invalid batch sizes,
/// batches over the hard API ceiling, unparseable configuration files.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum ConfigErrorKind {
    /// A named setting or argument holds an unusable value
    #[display("invalid value for `{}`: {}", setting, reason)]
    InvalidValue {
        /// The offending setting or argument
        setting: &'static str,
        /// Why the value was rejected
        reason: String,
    },
    /// A configuration source could not be read, parsed, or applied
    #[display("{}", _0)]
    Source(String),
}

/// Configuration error with source location.
///
/// # Examples
///
/// ```
/// use rolodex_error::ConfigError;
///
/// let err = ConfigError::invalid("batch_size", "must be greater than zero");
/// assert!(format!("{}", err).contains("`batch_size`"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Configuration Error: {} at line {} in {}", kind, line, file)]
pub struct ConfigError {
    /// The kind of error that occurred
    pub kind: ConfigErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl ConfigError {
    /// Create a new ConfigError for a failed configuration source.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind: ConfigErrorKind::Source(message.into()),
            line: location.line(),
            file: location.file(),
        }
    }

    /// Create a new ConfigError naming the offending setting or argument.
    ///
    /// # Examples
    ///
    /// ```
    /// use rolodex_error::ConfigError;
    ///
    /// let err = ConfigError::invalid("api_key", "not a valid header value");
    /// assert!(format!("{}", err).contains("api_key"));
    /// ```
    #[track_caller]
    pub fn invalid(setting: &'static str, reason: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind: ConfigErrorKind::InvalidValue {
                setting,
                reason: reason.into(),
            },
            line: location.line(),
            file: location.file(),
        }
    }
}
