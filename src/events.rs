//! Observability events emitted by the retry middleware.

use http::{Method, StatusCode};
use std::time::Duration;
use url::Url;

/// How a retry cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    /// The retried attempt produced a final outcome.
    Settled,
    /// The retried attempt failed again in a retryable way.
    StillRetryable,
    /// Cancellation fired during the wait; no attempt was made.
    Cancelled,
}

/// Facts about one wait-then-retry cycle.
#[derive(Debug, Clone)]
pub struct RetryEvent {
    /// The retry number, starting at 1 for the first retry.
    pub attempt: u32,
    /// The wait computed before this retry.
    pub wait: Duration,
    /// Total time spent waiting so far, including this cycle.
    pub waited: Duration,
    /// The request method.
    pub method: Method,
    /// The request URL.
    pub url: Url,
    /// The response status of this cycle, or the last one seen when cancelled.
    pub status: Option<StatusCode>,
    /// The error of this cycle, rendered as text.
    pub error: Option<String>,
    /// How the cycle ended.
    pub outcome: RetryOutcome,
}

/// Receives retry events.
///
/// Sinks cannot influence the retry loop. A panicking sink is caught and
/// logged.
///
/// Any `Fn(&RetryEvent)` closure is a sink.
///
/// # Examples
///
/// ```
/// use std::sync::{Arc, Mutex};
/// use transport_chain::{events::RetryEvent, Retry};
///
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let recorder = Arc::clone(&seen);
///
/// let base = transport_chain::default_transport();
/// let retry = Retry::builder(base)
///     .max_retries(3)
///     .event_sink(move |event: &RetryEvent| {
///         recorder.lock().unwrap().push(event.attempt);
///     })
///     .build()
///     .unwrap();
/// ```
pub trait EventSink: Send + Sync {
    /// Records one event.
    fn record(&self, event: &RetryEvent);
}

impl<F> EventSink for F
where
    F: Fn(&RetryEvent) + Send + Sync,
{
    fn record(&self, event: &RetryEvent) {
        self(event)
    }
}

/// The default sink: structured `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: &RetryEvent) {
        let status = event.status.map(|s| s.as_u16());
        let wait_ms = event.wait.as_millis() as u64;
        let waited_ms = event.waited.as_millis() as u64;

        match event.outcome {
            RetryOutcome::Settled => tracing::info!(
                attempt = event.attempt,
                wait_ms,
                waited_ms,
                method = %event.method,
                url = %event.url,
                status,
                error = event.error.as_deref(),
                "Retried request settled"
            ),
            RetryOutcome::StillRetryable => tracing::warn!(
                attempt = event.attempt,
                wait_ms,
                waited_ms,
                method = %event.method,
                url = %event.url,
                status,
                error = event.error.as_deref(),
                "Retried request failed"
            ),
            RetryOutcome::Cancelled => tracing::info!(
                attempt = event.attempt,
                wait_ms,
                waited_ms,
                method = %event.method,
                url = %event.url,
                status,
                "Request cancelled while waiting to retry"
            ),
        }
    }
}
