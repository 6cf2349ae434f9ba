//! Trait definitions for the rolodex contact-enrichment client.
//!
//! This crate provides the transport seam between the admission/retry runtime
//! and whatever actually moves bytes. The runtime never constructs
//! connections itself; it only classifies what the transport hands back.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod transport;

pub use transport::{EnrichmentTransport, Method};
