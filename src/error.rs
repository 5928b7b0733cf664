//! Error types for transport exchanges.
//!
//! Transport failures keep the underlying `reqwest::Error` so callers can inspect
//! it, while cancellation is a distinct variant that never gets confused with a
//! retryable failure.

use http::StatusCode;

/// The main error type for a request sent through a transport chain.
///
/// Exhausting retries is not represented here: when every attempt fails, the
/// caller receives the last attempt's own response or error.
///
/// # Examples
///
/// ```no_run
/// use transport_chain::{chain, Error, Request, Transport};
/// use http::Method;
///
/// # async fn example() -> Result<(), Error> {
/// let transport = chain(None, []);
/// let request = Request::new(Method::GET, "https://api.example.com/health")?;
///
/// match transport.send(request).await {
///     Ok(response) => println!("status: {}", response.status()),
///     Err(Error::Cancelled { last_status }) => {
///         eprintln!("cancelled, last status seen: {:?}", last_status);
///     }
///     Err(e) if e.is_retryable() => eprintln!("transient failure: {}", e),
///     Err(e) => eprintln!("permanent failure: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A transport-level error occurred (connection failed, redirect limit hit,
    /// unsupported scheme, untrusted certificate, etc.).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The request's cancellation fired before the exchange completed.
    ///
    /// `last_status` holds the status of the last response observed before
    /// cancellation, if any attempt produced one.
    #[error("Request cancelled")]
    Cancelled {
        /// Status of the last response seen before cancellation
        last_status: Option<StatusCode>,
    },

    /// Invalid configuration was provided.
    ///
    /// Raised at construction time for invalid header names or values,
    /// inverted delay ranges, or a zero retry bound.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// An invalid URL was provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    /// Returns `true` if retrying the exchange could change the outcome.
    ///
    /// Only transport errors are ever retryable, and only when they are not
    /// caused by a redirect limit, an unsupported scheme or an untrusted
    /// certificate.
    ///
    /// # Examples
    ///
    /// ```
    /// use transport_chain::Error;
    ///
    /// let err = Error::Cancelled { last_status: None };
    /// assert!(!err.is_retryable());
    ///
    /// let err = Error::ConfigurationError("bad header".to_string());
    /// assert!(!err.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        crate::classify::classify_error(self).is_retryable()
    }

    /// Returns `true` if this error was caused by cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled { .. })
    }

    /// Returns the HTTP status code associated with this error, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Network(e) => e.status(),
            Error::Cancelled { last_status } => *last_status,
            _ => None,
        }
    }
}

/// A specialized `Result` type for transport exchanges.
pub type Result<T> = std::result::Result<T, Error>;
