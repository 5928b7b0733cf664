//! The request type passed through a transport chain.

use crate::{Cancellation, Error, Result};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use url::Url;

/// An outbound HTTP request plus the cancellation signal that governs it.
///
/// Middleware mutates the request in place (headers mostly) before forwarding
/// it. The body is consumed when the request is sent; [`Request::try_clone`]
/// returns a replayable copy only when the body is held in memory.
///
/// # Examples
///
/// ```
/// use transport_chain::{Cancellation, Request};
/// use http::Method;
///
/// # fn example() -> Result<(), transport_chain::Error> {
/// let request = Request::new(Method::POST, "https://api.example.com/users")?
///     .with_header("content-type", "application/json")?
///     .with_body(r#"{"name":"Alice"}"#)
///     .with_cancellation(Cancellation::new());
///
/// assert_eq!(request.method(), Method::POST);
/// assert!(request.try_clone().is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Request {
    inner: reqwest::Request,
    cancellation: Cancellation,
}

impl Request {
    /// Creates a request with the given method and absolute URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn new(method: Method, url: impl AsRef<str>) -> Result<Self> {
        let url = Url::parse(url.as_ref())?;
        Ok(Self::from(reqwest::Request::new(method, url)))
    }

    /// Replaces the cancellation signal of this request.
    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Adds a header to the request, replacing any existing value.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let (name, value) = parse_header(name.as_ref(), value.as_ref())?;
        self.inner.headers_mut().insert(name, value);
        Ok(self)
    }

    /// Sets the request body.
    pub fn with_body(mut self, body: impl Into<reqwest::Body>) -> Self {
        *self.inner.body_mut() = Some(body.into());
        self
    }

    /// Returns the HTTP method.
    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    /// Returns the request URL.
    pub fn url(&self) -> &Url {
        self.inner.url()
    }

    /// Returns the request headers.
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Returns the request headers for mutation.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    /// Returns the request body, if any.
    pub fn body(&self) -> Option<&reqwest::Body> {
        self.inner.body()
    }

    /// Returns the cancellation signal governing this request.
    pub fn cancellation(&self) -> &Cancellation {
        &self.cancellation
    }

    /// Returns a copy of this request sharing the same cancellation signal.
    ///
    /// Returns `None` when the body is a stream and cannot be replayed.
    pub fn try_clone(&self) -> Option<Self> {
        Some(Self {
            inner: self.inner.try_clone()?,
            cancellation: self.cancellation.clone(),
        })
    }

    /// Splits the request into the underlying `reqwest` request and its signal.
    pub fn into_parts(self) -> (reqwest::Request, Cancellation) {
        (self.inner, self.cancellation)
    }
}

impl From<reqwest::Request> for Request {
    fn from(inner: reqwest::Request) -> Self {
        Self {
            inner,
            cancellation: Cancellation::new(),
        }
    }
}

/// Validates a header name and value pair.
pub(crate) fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let name = HeaderName::try_from(name)
        .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
    let value = HeaderValue::try_from(value)
        .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
    Ok((name, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url_is_rejected() {
        let result = Request::new(Method::GET, "not a url");
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_invalid_header_is_rejected() {
        let request = Request::new(Method::GET, "http://example.test/").unwrap();
        let result = request.with_header("bad header", "value");
        assert!(matches!(result, Err(Error::ConfigurationError(_))));
    }

    #[test]
    fn test_clone_shares_cancellation() {
        let request = Request::new(Method::GET, "http://example.test/")
            .unwrap()
            .with_header("x-trace", "abc")
            .unwrap();
        let copy = request.try_clone().unwrap();

        request.cancellation().cancel();
        assert!(copy.cancellation().is_cancelled());
        assert_eq!(copy.headers().get("x-trace").unwrap(), "abc");
    }

    #[test]
    fn test_in_memory_body_is_replayable() {
        let request = Request::new(Method::POST, "http://example.test/")
            .unwrap()
            .with_body("payload");
        let copy = request.try_clone().unwrap();
        assert_eq!(copy.body().and_then(|b| b.as_bytes()), Some(&b"payload"[..]));
    }
}
