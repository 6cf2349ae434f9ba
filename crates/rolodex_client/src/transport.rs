//! Production HTTP transport over reqwest.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use rolodex_core::{RawBody, RawHttpResult};
use rolodex_error::{ConfigError, RolodexError, RolodexResult, TransportError, TransportErrorKind};
use rolodex_interface::{EnrichmentTransport, Method};
use rolodex_rate_limit::ClientConfig;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

/// reqwest-backed implementation of [`EnrichmentTransport`].
///
/// Owns the connection pool and the per-request timeout. Transport-level
/// faults (timeout, connection refused, DNS, unreadable body) are converted
/// into [`TransportError`] results at this boundary — they never escape as
/// panics or reqwest error types. An HTTP error status is still a successful
/// exchange from the transport's point of view.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport for the given service base URL and API key.
    pub fn new(
        base_url: impl Into<String>,
        api_key: &str,
        timeout: Duration,
    ) -> RolodexResult<Self> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|e| ConfigError::invalid("api_key", e.to_string()))?;
        headers.insert(AUTHORIZATION, bearer);

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| {
                RolodexError::from(ConfigError::new(format!(
                    "Failed to build HTTP client: {}",
                    e
                )))
            })?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Create a transport from the client configuration section.
    pub fn from_config(config: &ClientConfig, api_key: &str) -> RolodexResult<Self> {
        Self::new(
            config.base_url.clone(),
            api_key,
            Duration::from_secs(config.request_timeout_secs),
        )
    }
}

#[async_trait]
impl EnrichmentTransport for HttpTransport {
    #[instrument(skip(self, body), fields(method = %method, path))]
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> RolodexResult<RawHttpResult> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));

        let request = match method {
            Method::Get => self.http.get(&url),
            Method::Post => self.http.post(&url),
        };
        let request = match body {
            Some(body) => request.json(&body),
            None => request,
        };

        let response = request.send().await.map_err(classify_reqwest_error)?;
        let status_code = response.status().as_u16();
        let headers = response.headers().clone();
        let text = response.text().await.map_err(|e| {
            RolodexError::from(TransportError::new(TransportErrorKind::MalformedBody(
                e.to_string(),
            )))
        })?;

        debug!(status_code, bytes = text.len(), "Transport exchange complete");

        let body = match serde_json::from_str::<Value>(&text) {
            Ok(json) => RawBody::Json(json),
            Err(_) => RawBody::Text(text),
        };
        Ok(RawHttpResult::new(status_code, headers, body))
    }
}

/// Map a reqwest error onto the transport error taxonomy.
fn classify_reqwest_error(error: reqwest::Error) -> RolodexError {
    let kind = if error.is_timeout() {
        TransportErrorKind::Timeout(error.to_string())
    } else if error.is_connect() {
        TransportErrorKind::Connection(error.to_string())
    } else if error.is_request() || error.is_builder() {
        TransportErrorKind::Request(error.to_string())
    } else {
        TransportErrorKind::Connection(error.to_string())
    };
    TransportError::new(kind).into()
}
