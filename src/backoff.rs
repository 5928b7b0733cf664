//! Backoff computation between retry attempts.

use http::{header::RETRY_AFTER, HeaderMap, StatusCode};
use std::time::Duration;

/// Default lower bound of the exponential backoff.
pub const DEFAULT_MIN_BACKOFF: Duration = Duration::from_secs(1);

/// Default ceiling of the exponential backoff.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(16);

/// Computes the wait before a retry attempt.
///
/// A `Retry-After` header on a 429 or 503 response wins. Otherwise the wait is
/// `min * 2^attempt`, clamped to `max`. Attempt 1 is the first retry, so with
/// the defaults the waits are 2s, 4s, 8s, 16s, 16s...
///
/// # Examples
///
/// ```
/// use transport_chain::Backoff;
/// use std::time::Duration;
///
/// let backoff = Backoff::default();
/// assert_eq!(backoff.exponential(1), Duration::from_secs(2));
/// assert_eq!(backoff.exponential(4), Duration::from_secs(16));
/// assert_eq!(backoff.exponential(40), Duration::from_secs(16));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    min: Duration,
    max: Duration,
}

impl Backoff {
    /// Creates a backoff with the given bounds.
    pub fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    /// Returns the lower bound.
    pub fn min(&self) -> Duration {
        self.min
    }

    /// Returns the ceiling.
    pub fn max(&self) -> Duration {
        self.max
    }

    /// Returns the wait before retry number `attempt`, given the last response.
    ///
    /// The `Retry-After` value is used as-is, without the ceiling.
    pub fn delay(&self, response: Option<&reqwest::Response>, attempt: u32) -> Duration {
        if let Some(response) = response {
            if honors_retry_after(response.status()) {
                if let Some(hint) = retry_after(response.headers()) {
                    return hint;
                }
            }
        }
        self.exponential(attempt)
    }

    /// Returns `min * 2^attempt`, clamped to the ceiling on overflow.
    pub fn exponential(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt)
            .and_then(|multiplier| self.min.checked_mul(multiplier))
            .filter(|wait| *wait <= self.max)
            .unwrap_or(self.max)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_BACKOFF, DEFAULT_MAX_BACKOFF)
    }
}

fn honors_retry_after(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE
}

/// Parses a `Retry-After` header given in whole seconds.
///
/// HTTP-date values, negative numbers and garbage yield `None`, so the caller
/// falls back to the computed backoff. A negative hint never turns into an
/// immediate retry.
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let header = headers.get(RETRY_AFTER)?.to_str().ok()?;
    header.trim().parse::<u64>().ok().map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn response(status: u16, retry_after: Option<&'static str>) -> reqwest::Response {
        let mut builder = http::Response::builder().status(status);
        if let Some(value) = retry_after {
            builder = builder.header(RETRY_AFTER, value);
        }
        builder.body("").unwrap().into()
    }

    #[test]
    fn test_exponential_delays() {
        let backoff = Backoff::default();
        let resp = response(500, None);

        assert_eq!(backoff.delay(Some(&resp), 1), Duration::from_secs(2));
        assert_eq!(backoff.delay(Some(&resp), 2), Duration::from_secs(4));
        assert_eq!(backoff.delay(Some(&resp), 3), Duration::from_secs(8));
        assert_eq!(backoff.delay(Some(&resp), 4), Duration::from_secs(16));
        assert_eq!(backoff.delay(Some(&resp), 5), Duration::from_secs(16));
    }

    #[test]
    fn test_overflow_clamps_to_ceiling() {
        let backoff = Backoff::default();
        assert_eq!(backoff.exponential(32), DEFAULT_MAX_BACKOFF);
        assert_eq!(backoff.exponential(u32::MAX), DEFAULT_MAX_BACKOFF);

        let huge = Backoff::new(Duration::MAX, Duration::from_secs(3));
        assert_eq!(huge.exponential(1), Duration::from_secs(3));
    }

    #[test]
    fn test_retry_after_wins_for_429() {
        let backoff = Backoff::default();
        let resp = response(429, Some("5"));

        assert_eq!(backoff.delay(Some(&resp), 1), Duration::from_secs(5));
        assert_eq!(backoff.delay(Some(&resp), 4), Duration::from_secs(5));
    }

    #[test]
    fn test_retry_after_wins_for_503_even_above_ceiling() {
        let backoff = Backoff::default();
        let resp = response(503, Some("120"));
        assert_eq!(backoff.delay(Some(&resp), 1), Duration::from_secs(120));
    }

    #[test]
    fn test_retry_after_ignored_for_other_statuses() {
        let backoff = Backoff::default();
        let resp = response(500, Some("5"));
        assert_eq!(backoff.delay(Some(&resp), 1), Duration::from_secs(2));
    }

    #[test]
    fn test_unparseable_retry_after_falls_back() {
        let backoff = Backoff::default();
        let date = response(429, Some("Wed, 21 Oct 2015 07:28:00 GMT"));
        let negative = response(429, Some("-3"));

        assert_eq!(backoff.delay(Some(&date), 2), Duration::from_secs(4));
        assert_eq!(backoff.delay(Some(&negative), 2), Duration::from_secs(4));
    }

    #[test]
    fn test_no_response_uses_exponential() {
        let backoff = Backoff::new(Duration::from_millis(100), Duration::from_secs(1));
        assert_eq!(backoff.delay(None, 1), Duration::from_millis(200));
        assert_eq!(backoff.delay(None, 4), Duration::from_secs(1));
    }

    #[test]
    fn test_parse_retry_after_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("60"));
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(60)));

        assert_eq!(retry_after(&HeaderMap::new()), None);
    }
}
