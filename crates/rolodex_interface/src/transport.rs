//! Transport boundary trait.

use async_trait::async_trait;
use rolodex_core::RawHttpResult;
use rolodex_error::RolodexResult;
use serde_json::Value;

/// HTTP method for a transport call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum Method {
    /// GET request
    #[display("GET")]
    Get,
    /// POST request
    #[display("POST")]
    Post,
}

/// Abstract transport collaborator for the enrichment service.
///
/// Implementations own connection pooling, TLS, and per-request timeouts.
/// They must convert transport-level faults (timeout, connection refused,
/// DNS failure, malformed body) into `TransportError` results rather than
/// panicking or leaking foreign error types. An HTTP response with an error
/// status is still an `Ok(RawHttpResult)` — classification is the runtime's
/// job.
#[async_trait]
pub trait EnrichmentTransport: Send + Sync {
    /// Execute one HTTP exchange against the service.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> RolodexResult<RawHttpResult>;
}

#[async_trait]
impl<T: EnrichmentTransport + ?Sized> EnrichmentTransport for std::sync::Arc<T> {
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> RolodexResult<RawHttpResult> {
        (**self).execute(method, path, body).await
    }
}
