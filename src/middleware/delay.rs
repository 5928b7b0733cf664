//! Artificial delay before sending and before returning responses.

use crate::transport::{SharedTransport, Transport};
use crate::{Cancellation, Error, Middleware, Request, Result};
use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Delay ranges for the [`delayed`] middleware.
///
/// Each wait is drawn uniformly from `[min, max)`; equal bounds give a fixed
/// delay and zero bounds disable that wait.
///
/// # Examples
///
/// ```
/// use transport_chain::middleware::{delayed, DelayConfig};
/// use std::time::Duration;
///
/// # fn example() -> Result<(), transport_chain::Error> {
/// let slow_responses = delayed(DelayConfig {
///     response_delay_min: Duration::from_millis(100),
///     response_delay_max: Duration::from_millis(200),
///     ..Default::default()
/// })?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayConfig {
    /// Minimum wait before the request is sent.
    pub request_delay_min: Duration,
    /// Maximum wait before the request is sent.
    pub request_delay_max: Duration,
    /// Minimum wait before the response is returned.
    pub response_delay_min: Duration,
    /// Maximum wait before the response is returned.
    pub response_delay_max: Duration,
}

impl DelayConfig {
    fn validate(&self) -> Result<()> {
        if self.request_delay_min > self.request_delay_max {
            return Err(Error::ConfigurationError(format!(
                "request delay min {:?} is greater than max {:?}",
                self.request_delay_min, self.request_delay_max
            )));
        }
        if self.response_delay_min > self.response_delay_max {
            return Err(Error::ConfigurationError(format!(
                "response delay min {:?} is greater than max {:?}",
                self.response_delay_min, self.response_delay_max
            )));
        }
        Ok(())
    }
}

struct Delayed {
    config: DelayConfig,
    next: SharedTransport,
}

#[async_trait]
impl Transport for Delayed {
    async fn send(&self, request: Request) -> Result<reqwest::Response> {
        let cancellation = request.cancellation().clone();

        let request_delay =
            random_delay(self.config.request_delay_min, self.config.request_delay_max);
        pause(&cancellation, request_delay).await?;

        let outcome = self.next.send(request).await;

        let response_delay =
            random_delay(self.config.response_delay_min, self.config.response_delay_max);
        pause(&cancellation, response_delay).await?;

        outcome
    }
}

/// Delays requests and responses by random amounts, useful when testing
/// timeouts and cancellation.
///
/// Both waits race the request's cancellation and fail with
/// [`Error::Cancelled`] when it fires.
///
/// # Errors
///
/// Returns an error if a minimum is greater than its maximum.
pub fn delayed(config: DelayConfig) -> Result<Middleware> {
    config.validate()?;
    Ok(Middleware::new("delayed", move |next| {
        Arc::new(Delayed {
            config: config.clone(),
            next,
        })
    }))
}

fn random_delay(min: Duration, max: Duration) -> Duration {
    if min >= max {
        return min;
    }
    rand::thread_rng().gen_range(min..max)
}

async fn pause(cancellation: &Cancellation, delay: Duration) -> Result<()> {
    if delay.is_zero() {
        return Ok(());
    }
    tokio::select! {
        biased;
        _ = cancellation.cancelled() => Err(Error::Cancelled { last_status: None }),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}
