//! Retryability classification of exchange outcomes.
//!
//! Classification is a pure function of the outcome: the same response or
//! error always yields the same answer.

use crate::{Error, Result};
use std::error::Error as StdError;

/// Whether an outcome is worth another attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retryability {
    /// A transient failure; another attempt may succeed.
    Retryable,
    /// The outcome is final.
    Terminal,
}

impl Retryability {
    /// Returns `true` for [`Retryability::Retryable`].
    pub fn is_retryable(self) -> bool {
        self == Retryability::Retryable
    }
}

/// Markers found in errors that no number of retries can fix.
///
/// Redirect limits and bad schemes are detected through `reqwest::Error`
/// kinds; these catch the same conditions when they only surface as text
/// deeper in the source chain.
const TERMINAL_ERROR_MARKERS: &[&str] = &[
    "too many redirects",
    "unsupported protocol scheme",
    "url scheme is not allowed",
    "certificate is not trusted",
    "invalid peer certificate",
    "unknownissuer",
    "unknown issuer",
    "unable to get local issuer certificate",
    "self signed certificate",
];

/// Classifies the outcome of one exchange.
///
/// # Examples
///
/// ```
/// use transport_chain::classify::{classify, Retryability};
///
/// let unavailable: reqwest::Response =
///     http::Response::builder().status(503).body("").unwrap().into();
/// assert_eq!(classify(&Ok(unavailable)), Retryability::Retryable);
///
/// let not_implemented: reqwest::Response =
///     http::Response::builder().status(501).body("").unwrap().into();
/// assert_eq!(classify(&Ok(not_implemented)), Retryability::Terminal);
/// ```
pub fn classify(outcome: &Result<reqwest::Response>) -> Retryability {
    match outcome {
        Ok(response) => classify_status(response.status().as_u16()),
        Err(error) => classify_error(error),
    }
}

/// Shorthand for `classify(outcome).is_retryable()`.
pub fn is_retryable(outcome: &Result<reqwest::Response>) -> bool {
    classify(outcome).is_retryable()
}

/// Classifies a raw status code.
///
/// `0` stands for "no real response received" and is retryable, as are 429
/// and every 5xx except 501.
pub fn classify_status(status: u16) -> Retryability {
    match status {
        0 | 429 => Retryability::Retryable,
        501 => Retryability::Terminal,
        500..=599 => Retryability::Retryable,
        _ => Retryability::Terminal,
    }
}

/// Classifies an error that arrived without a response.
///
/// Transport errors are retryable unless they come from a redirect limit, an
/// unsupported scheme or an untrusted certificate. Everything else is terminal.
pub fn classify_error(error: &Error) -> Retryability {
    match error {
        Error::Network(inner) if is_terminal_transport_error(inner) => Retryability::Terminal,
        Error::Network(_) => Retryability::Retryable,
        Error::Cancelled { .. } | Error::ConfigurationError(_) | Error::InvalidUrl(_) => {
            Retryability::Terminal
        }
    }
}

fn is_terminal_transport_error(error: &reqwest::Error) -> bool {
    if error.is_redirect() || error.is_builder() {
        return true;
    }

    has_terminal_marker(error)
}

/// Walks the source chain looking for a redirect, scheme or certificate trust
/// failure that only surfaces as text.
fn has_terminal_marker(error: &(dyn StdError + 'static)) -> bool {
    let mut source = Some(error);
    while let Some(current) = source {
        let message = current.to_string().to_ascii_lowercase();
        if TERMINAL_ERROR_MARKERS.iter().any(|m| message.contains(m)) {
            return true;
        }
        source = current.source();
    }
    false
}
