//! The transport abstraction every middleware wraps.

use crate::{Chain, Error, Request, Result};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// Performs one HTTP exchange.
///
/// Implementations must be safe to invoke concurrently and repeatedly; the
/// chain and the retry middleware call the same transport many times.
///
/// `reqwest::Client` implements this trait and is the default base transport.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use transport_chain::{Request, Result, Transport};
///
/// struct AlwaysTeapot;
///
/// #[async_trait]
/// impl Transport for AlwaysTeapot {
///     async fn send(&self, _request: Request) -> Result<reqwest::Response> {
///         let response = http::Response::builder().status(418).body("").unwrap();
///         Ok(response.into())
///     }
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends the request and returns the response or the transport error.
    async fn send(&self, request: Request) -> Result<reqwest::Response>;

    /// Returns the chain behind this transport when it is one.
    ///
    /// [`Chain::new`] uses this to append to an existing chain instead of
    /// nesting it.
    fn as_chain(&self) -> Option<&Chain> {
        None
    }
}

/// A transport shared between chains and middleware.
pub type SharedTransport = Arc<dyn Transport>;

/// Returns the process default transport, a fresh `reqwest::Client`.
pub fn default_transport() -> SharedTransport {
    Arc::new(reqwest::Client::new())
}

#[async_trait]
impl Transport for reqwest::Client {
    async fn send(&self, request: Request) -> Result<reqwest::Response> {
        let (request, cancellation) = request.into_parts();
        tokio::select! {
            biased;
            _ = cancellation.cancelled() => Err(Error::Cancelled { last_status: None }),
            result = self.execute(request) => result.map_err(Error::from),
        }
    }
}

/// A transport built from an async function.
///
/// Created with [`transport_fn`].
pub struct TransportFn<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Transport for TransportFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<reqwest::Response>> + Send,
{
    async fn send(&self, request: Request) -> Result<reqwest::Response> {
        (self.f)(request).await
    }
}

/// Lifts an async function into a [`SharedTransport`].
///
/// # Examples
///
/// ```
/// use transport_chain::{transport_fn, Request};
///
/// let transport = transport_fn(|request: Request| async move {
///     let response = http::Response::builder()
///         .status(200)
///         .body(request.url().to_string())
///         .unwrap();
///     Ok(reqwest::Response::from(response))
/// });
/// ```
pub fn transport_fn<F, Fut>(f: F) -> SharedTransport
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<reqwest::Response>> + Send + 'static,
{
    Arc::new(TransportFn { f })
}
