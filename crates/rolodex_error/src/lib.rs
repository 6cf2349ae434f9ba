//! Error types for the rolodex contact-enrichment client.
//!
//! This crate provides the foundation error types used throughout the rolodex
//! workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern for clean error
//! handling:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use rolodex_error::{RolodexResult, TransportError, TransportErrorKind};
//!
//! fn fetch_contact() -> RolodexResult<String> {
//!     Err(TransportError::new(TransportErrorKind::Connection(
//!         "connection refused".to_string(),
//!     )))?
//! }
//!
//! match fetch_contact() {
//!     Ok(data) => println!("Got: {}", data),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod circuit;
mod config;
mod error;
mod quota;
mod transport;

pub use circuit::CircuitOpenError;
pub use config::{ConfigError, ConfigErrorKind};
pub use error::{RolodexError, RolodexErrorKind, RolodexResult};
pub use quota::{QuotaError, QuotaErrorKind};
pub use transport::{RetryableError, TransportError, TransportErrorKind};
