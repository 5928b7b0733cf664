//! Header-setting middleware.

use crate::request::parse_header;
use crate::transport::{SharedTransport, Transport};
use crate::{Error, Middleware, Request, Result};
use async_trait::async_trait;
use http::header::{AUTHORIZATION, USER_AGENT};
use http::{HeaderName, HeaderValue};
use std::sync::Arc;

struct SetHeader {
    name: HeaderName,
    value: HeaderValue,
    next: SharedTransport,
}

#[async_trait]
impl Transport for SetHeader {
    async fn send(&self, mut request: Request) -> Result<reqwest::Response> {
        request
            .headers_mut()
            .insert(self.name.clone(), self.value.clone());
        self.next.send(request).await
    }
}

fn header_middleware(label: &'static str, name: HeaderName, value: HeaderValue) -> Middleware {
    Middleware::new(label, move |next| {
        Arc::new(SetHeader {
            name: name.clone(),
            value: value.clone(),
            next,
        })
    })
}

/// Sets a header on every request, replacing any existing value.
///
/// # Errors
///
/// Returns an error if the header name or value is invalid.
pub fn set_header(name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Middleware> {
    let (name, value) = parse_header(name.as_ref(), value.as_ref())?;
    Ok(header_middleware("set-header", name, value))
}

/// Sets the `Authorization` header on every request.
///
/// # Errors
///
/// Returns an error if the value is not a valid header value.
pub fn authorization(value: impl AsRef<str>) -> Result<Middleware> {
    let value = HeaderValue::try_from(value.as_ref())
        .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
    Ok(header_middleware("authorization", AUTHORIZATION, value))
}

/// Sets the `User-Agent` header on every request.
///
/// # Errors
///
/// Returns an error if the value is not a valid header value.
pub fn user_agent(value: impl AsRef<str>) -> Result<Middleware> {
    let value = HeaderValue::try_from(value.as_ref())
        .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
    Ok(header_middleware("user-agent", USER_AGENT, value))
}

type ValueFn = dyn Fn(&Request) -> String + Send + Sync;

struct SetHeaderWith {
    name: HeaderName,
    value: Arc<ValueFn>,
    next: SharedTransport,
}

#[async_trait]
impl Transport for SetHeaderWith {
    async fn send(&self, mut request: Request) -> Result<reqwest::Response> {
        let value = HeaderValue::try_from((self.value)(&request)).map_err(|e| {
            Error::ConfigurationError(format!("Invalid value for header {}: {}", self.name, e))
        })?;
        request.headers_mut().insert(self.name.clone(), value);
        self.next.send(request).await
    }
}

/// Sets a header whose value is computed per request.
///
/// # Errors
///
/// Returns an error if the header name is invalid. A computed value that is
/// not a valid header value fails that request with a configuration error.
///
/// # Examples
///
/// ```
/// use transport_chain::middleware::set_header_with;
///
/// # fn example() -> Result<(), transport_chain::Error> {
/// let layer = set_header_with("x-request-path", |request| request.url().path().to_string())?;
/// # Ok(())
/// # }
/// ```
pub fn set_header_with<F>(name: impl AsRef<str>, value: F) -> Result<Middleware>
where
    F: Fn(&Request) -> String + Send + Sync + 'static,
{
    let name = HeaderName::try_from(name.as_ref())
        .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
    let value: Arc<ValueFn> = Arc::new(value);

    Ok(Middleware::new("set-header-with", move |next| {
        Arc::new(SetHeaderWith {
            name: name.clone(),
            value: Arc::clone(&value),
            next,
        })
    }))
}
