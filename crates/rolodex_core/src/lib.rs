//! Core data types for the rolodex contact-enrichment client.
//!
//! This crate holds the pure data carriers shared across the workspace:
//! the [`ResponseEnvelope`] produced at the transport boundary, the
//! [`RawHttpResult`] the transport hands back, and the progress event types
//! emitted during batch processing. No behavior beyond classification and
//! header extraction lives here.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod envelope;
mod progress;
mod raw;

pub use envelope::ResponseEnvelope;
pub use progress::{ProgressCallback, ProgressEvent};
pub use raw::{RawBody, RawHttpResult};
