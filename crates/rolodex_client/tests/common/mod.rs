//! Scripted transport double shared by the client test suites.

#![allow(dead_code)]

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use rolodex_client::{EnrichmentTransport, Method, RawBody, RawHttpResult};
use rolodex_error::{RolodexResult, TransportError, TransportErrorKind};
use rolodex_rate_limit::RolodexConfig;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, Once};
use std::time::Duration;

static TRACING: Once = Once::new();

/// Install a test-writer subscriber once per process.
///
/// Honors `RUST_LOG`, so failing runs can be re-run with tracing output.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// One scripted transport outcome, consumed in order.
pub enum Scripted {
    /// An HTTP exchange that produced a response.
    Raw(RawHttpResult),
    /// A transport-level fault before any response.
    Fault(TransportErrorKind),
}

/// Transport double that plays back a script and records call pressure.
///
/// Calls to the credits endpoint are answered from a fixed response and
/// counted separately; every other call consumes the next scripted outcome,
/// falling back to a success that echoes the request's `subject_id`.
pub struct MockTransport {
    script: Mutex<VecDeque<Scripted>>,
    credits_response: Mutex<Option<RawHttpResult>>,
    delay: Option<Duration>,
    pub reveal_calls: AtomicUsize,
    pub credit_calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        init_tracing();
        Self {
            script: Mutex::new(VecDeque::new()),
            credits_response: Mutex::new(None),
            delay: None,
            reveal_calls: AtomicUsize::new(0),
            credit_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_script(outcomes: impl IntoIterator<Item = Scripted>) -> Self {
        let mock = Self::new();
        *mock.script.lock().unwrap() = outcomes.into_iter().collect();
        mock
    }

    /// Hold each non-credits call open for `delay`, to observe concurrency.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fix the credits endpoint's reported remaining balance.
    pub fn set_credits_remaining(&self, remaining: u32) {
        *self.credits_response.lock().unwrap() =
            Some(json_raw(200, json!({ "credits_remaining": remaining })));
    }

    /// Fix the credits endpoint's full response.
    pub fn set_credits_response(&self, response: RawHttpResult) {
        *self.credits_response.lock().unwrap() = Some(response);
    }

    pub fn reveal_calls(&self) -> usize {
        self.reveal_calls.load(Ordering::SeqCst)
    }

    pub fn credit_calls(&self) -> usize {
        self.credit_calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EnrichmentTransport for MockTransport {
    async fn execute(
        &self,
        _method: Method,
        path: &str,
        body: Option<Value>,
    ) -> RolodexResult<RawHttpResult> {
        if path == "credits" {
            self.credit_calls.fetch_add(1, Ordering::SeqCst);
            let fixed = self.credits_response.lock().unwrap().clone();
            return Ok(fixed
                .unwrap_or_else(|| json_raw(200, json!({ "credits_remaining": 100_000 }))));
        }

        self.reveal_calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Scripted::Raw(raw)) => Ok(raw),
            Some(Scripted::Fault(kind)) => Err(TransportError::new(kind).into()),
            None => {
                let subject = body
                    .as_ref()
                    .and_then(|b| b.get("subject_id"))
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string();
                Ok(json_raw(200, json!({ "subject_id": subject })))
            }
        }
    }
}

/// Build a raw result with a JSON body and no headers.
pub fn json_raw(status: u16, body: Value) -> RawHttpResult {
    RawHttpResult::new(status, HeaderMap::new(), RawBody::Json(body))
}

/// Build an error response with a conventional `error` field.
pub fn err_raw(status: u16, message: &str) -> RawHttpResult {
    json_raw(status, json!({ "error": message }))
}

/// Defaults tuned for tests: no jitter, millisecond backoff, no batch pauses.
pub fn fast_config() -> RolodexConfig {
    let mut config = RolodexConfig::default();
    config.retry.base_delay_ms = 1;
    config.retry.max_delay_ms = 5;
    config.retry.jitter_range = 0.0;
    config.client.inter_batch_delay_ms = 0;
    config
}
