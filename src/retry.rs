//! Retry middleware with exponential backoff and `Retry-After` support.
//!
//! The middleware sends the first attempt through the transport it wraps
//! (`downstream`). Every repeated attempt goes straight to an explicitly given
//! `retry_base` transport, so middleware registered after the retry layer runs
//! only once per logical request while middleware registered before it has
//! already shaped the request that gets replayed.

use crate::backoff::{Backoff, DEFAULT_MAX_BACKOFF, DEFAULT_MIN_BACKOFF};
use crate::classify::classify;
use crate::events::{EventSink, RetryEvent, RetryOutcome, TracingSink};
use crate::transport::{SharedTransport, Transport};
use crate::{Error, Middleware, Request, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Plain retry settings, suitable for loading from a configuration file.
///
/// # Examples
///
/// ```
/// use transport_chain::RetryConfig;
/// use std::time::Duration;
///
/// let config = RetryConfig::default();
/// assert_eq!(config.max_retries, 5);
/// assert_eq!(config.min_backoff, Duration::from_secs(1));
/// assert_eq!(config.max_backoff, Duration::from_secs(16));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Additional attempts after the first one.
    pub max_retries: u32,
    /// Lower bound of the exponential backoff.
    pub min_backoff: Duration,
    /// Ceiling of the exponential backoff.
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            min_backoff: DEFAULT_MIN_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
        }
    }
}

/// Retry policy bound to the transport that performs repeated attempts.
///
/// Turn it into a [`Middleware`] with [`Retry::middleware`], or use the
/// [`retry`] shorthand.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use transport_chain::{chain, Retry, SharedTransport};
///
/// # fn example() -> Result<(), transport_chain::Error> {
/// let base: SharedTransport = Arc::new(reqwest::Client::new());
///
/// let retry = Retry::builder(base.clone())
///     .max_retries(3)
///     .min_backoff(Duration::from_millis(250))
///     .max_backoff(Duration::from_secs(5))
///     .build()?;
///
/// let transport = chain(Some(base), [retry.middleware()]);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Retry {
    retry_base: SharedTransport,
    max_retries: u32,
    backoff: Backoff,
    sink: Arc<dyn EventSink>,
}

impl Retry {
    /// Creates a policy with the default backoff and the tracing sink.
    ///
    /// A `max_retries` of zero disables retries; use [`Retry::builder`] to
    /// have that rejected instead.
    pub fn new(retry_base: SharedTransport, max_retries: u32) -> Self {
        Self {
            retry_base,
            max_retries,
            backoff: Backoff::default(),
            sink: Arc::new(TracingSink),
        }
    }

    /// Creates a builder for a policy retrying through `retry_base`.
    pub fn builder(retry_base: SharedTransport) -> RetryBuilder {
        RetryBuilder::new(retry_base)
    }

    /// Returns the bound on additional attempts.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns the backoff used between attempts.
    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    /// Converts the policy into a middleware.
    pub fn middleware(self) -> Middleware {
        Middleware::new("retry", move |downstream| {
            Arc::new(RetryTransport {
                downstream,
                policy: self.clone(),
            })
        })
    }

    async fn execute(
        &self,
        downstream: &SharedTransport,
        request: Request,
    ) -> Result<reqwest::Response> {
        let replay = request.try_clone();
        let cancellation = request.cancellation().clone();
        let method = request.method().clone();
        let url = request.url().clone();

        let mut outcome = downstream.send(request).await;
        if !classify(&outcome).is_retryable() {
            return outcome;
        }

        let Some(template) = replay else {
            tracing::warn!(
                method = %method,
                url = %url,
                "Request body cannot be replayed, returning first attempt"
            );
            return outcome;
        };

        let mut waited = Duration::ZERO;
        for attempt in 1..=self.max_retries {
            let wait = self.backoff.delay(outcome.as_ref().ok(), attempt);
            tracing::debug!(
                attempt = attempt,
                wait_ms = wait.as_millis() as u64,
                method = %method,
                url = %url,
                "Waiting before retry"
            );

            let started = Instant::now();
            tokio::select! {
                biased;
                _ = cancellation.cancelled() => {
                    waited += started.elapsed();
                    let last_status = status_of(&outcome);
                    self.emit(RetryEvent {
                        attempt,
                        wait,
                        waited,
                        method,
                        url,
                        status: last_status,
                        error: outcome.as_ref().err().map(ToString::to_string),
                        outcome: RetryOutcome::Cancelled,
                    });
                    return Err(Error::Cancelled { last_status });
                }
                _ = tokio::time::sleep(wait) => {}
            }
            waited += started.elapsed();

            let Some(request) = template.try_clone() else {
                break;
            };
            outcome = self.retry_base.send(request).await;
            let retryable = classify(&outcome).is_retryable();

            self.emit(RetryEvent {
                attempt,
                wait,
                waited,
                method: method.clone(),
                url: url.clone(),
                status: outcome.as_ref().ok().map(|r| r.status()),
                error: outcome.as_ref().err().map(ToString::to_string),
                outcome: if retryable {
                    RetryOutcome::StillRetryable
                } else {
                    RetryOutcome::Settled
                },
            });

            if !retryable {
                break;
            }
        }

        outcome
    }

    fn emit(&self, event: RetryEvent) {
        if catch_unwind(AssertUnwindSafe(|| self.sink.record(&event))).is_err() {
            tracing::warn!(attempt = event.attempt, "Retry event sink panicked");
        }
    }
}

fn status_of(outcome: &Result<reqwest::Response>) -> Option<http::StatusCode> {
    match outcome {
        Ok(response) => Some(response.status()),
        Err(error) => error.status(),
    }
}

/// Shorthand for `Retry::new(retry_base, max_retries).middleware()`.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use transport_chain::{chain, retry, SharedTransport};
///
/// let base: SharedTransport = Arc::new(reqwest::Client::new());
/// let transport = chain(Some(base.clone()), [retry(base, 5)]);
/// ```
pub fn retry(retry_base: SharedTransport, max_retries: u32) -> Middleware {
    Retry::new(retry_base, max_retries).middleware()
}

/// Builder for [`Retry`].
pub struct RetryBuilder {
    retry_base: SharedTransport,
    config: RetryConfig,
    sink: Option<Arc<dyn EventSink>>,
}

impl RetryBuilder {
    /// Creates a builder with default settings.
    pub fn new(retry_base: SharedTransport) -> Self {
        Self {
            retry_base,
            config: RetryConfig::default(),
            sink: None,
        }
    }

    /// Replaces all plain settings at once.
    pub fn config(mut self, config: RetryConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the bound on additional attempts after the first one.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    /// Sets the lower bound of the exponential backoff.
    pub fn min_backoff(mut self, min_backoff: Duration) -> Self {
        self.config.min_backoff = min_backoff;
        self
    }

    /// Sets the ceiling of the exponential backoff.
    pub fn max_backoff(mut self, max_backoff: Duration) -> Self {
        self.config.max_backoff = max_backoff;
        self
    }

    /// Sets the sink receiving one event per retry cycle.
    ///
    /// Defaults to [`TracingSink`].
    pub fn event_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Builds the policy.
    ///
    /// # Errors
    ///
    /// Returns an error if `max_retries` is zero or `min_backoff` exceeds
    /// `max_backoff`.
    pub fn build(self) -> Result<Retry> {
        let RetryConfig {
            max_retries,
            min_backoff,
            max_backoff,
        } = self.config;

        if max_retries == 0 {
            return Err(Error::ConfigurationError(
                "max_retries must be at least 1".to_string(),
            ));
        }
        if min_backoff > max_backoff {
            return Err(Error::ConfigurationError(format!(
                "min_backoff {:?} is greater than max_backoff {:?}",
                min_backoff, max_backoff
            )));
        }

        Ok(Retry {
            retry_base: self.retry_base,
            max_retries,
            backoff: Backoff::new(min_backoff, max_backoff),
            sink: self.sink.unwrap_or_else(|| Arc::new(TracingSink)),
        })
    }
}

struct RetryTransport {
    downstream: SharedTransport,
    policy: Retry,
}

#[async_trait]
impl Transport for RetryTransport {
    async fn send(&self, request: Request) -> Result<reqwest::Response> {
        self.policy.execute(&self.downstream, request).await
    }
}
