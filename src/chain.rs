//! Middleware composition.
//!
//! A [`Chain`] is an ordered list of [`Middleware`] plus one base transport.
//! Composition folds the list right to left over the base, so the first
//! middleware is outermost: it sees the request first and the response last.

use crate::transport::{default_transport, SharedTransport, Transport};
use crate::{Request, Result};
use async_trait::async_trait;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

type Layer = dyn Fn(SharedTransport) -> SharedTransport + Send + Sync;

/// A named function turning one transport into another.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use transport_chain::{Middleware, SharedTransport};
///
/// // A middleware that adds nothing.
/// let passthrough = Middleware::new("passthrough", |next: SharedTransport| next);
/// assert_eq!(passthrough.name(), "passthrough");
/// ```
#[derive(Clone)]
pub struct Middleware {
    name: Cow<'static, str>,
    layer: Arc<Layer>,
}

impl Middleware {
    /// Creates a middleware from a name and a wrapping function.
    pub fn new<F>(name: impl Into<Cow<'static, str>>, layer: F) -> Self
    where
        F: Fn(SharedTransport) -> SharedTransport + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            layer: Arc::new(layer),
        }
    }

    /// A middleware that returns the transport it is given.
    pub fn identity() -> Self {
        Self::new("identity", |next| next)
    }

    /// Returns the name used for inspection and logging.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wraps `next` with this middleware.
    pub fn wrap(&self, next: SharedTransport) -> SharedTransport {
        (self.layer)(next)
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Middleware").field(&self.name).finish()
    }
}

/// An ordered composition of middleware around a base transport.
///
/// Chains are immutable once built and can be shared across tasks.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use transport_chain::{middleware, retry, Chain, Request, SharedTransport, Transport};
/// use http::Method;
///
/// # async fn example() -> Result<(), transport_chain::Error> {
/// let base: SharedTransport = Arc::new(reqwest::Client::new());
///
/// let chain = Chain::new(
///     Some(base.clone()),
///     [
///         middleware::user_agent("my-app/1.0")?,
///         retry(base, 5),
///     ],
/// );
/// assert_eq!(chain.middleware_names(), vec!["user-agent", "retry"]);
///
/// let request = Request::new(Method::GET, "https://api.example.com/status")?;
/// let response = chain.send(request).await?;
/// println!("status: {}", response.status());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Chain {
    base: SharedTransport,
    middlewares: Vec<Middleware>,
    composed: SharedTransport,
}

impl Chain {
    /// Builds a chain around `base`, or around the default transport when
    /// `base` is `None`.
    ///
    /// When `base` is itself a chain, `middlewares` are appended to its list
    /// and its base is reused.
    pub fn new(
        base: Option<SharedTransport>,
        middlewares: impl IntoIterator<Item = Middleware>,
    ) -> Self {
        let inherited = base
            .as_ref()
            .and_then(|b| b.as_chain())
            .map(|c| (c.base.clone(), c.middlewares.clone()));

        let (base, mut list) = match inherited {
            Some(parts) => parts,
            None => (base.unwrap_or_else(default_transport), Vec::new()),
        };
        list.extend(middlewares);

        let composed = compose(&base, &list);
        tracing::trace!(middlewares = ?list, "Composed transport chain");

        Self {
            base,
            middlewares: list,
            composed,
        }
    }

    /// Returns a new chain with `middleware` added as the innermost layer.
    pub fn with(&self, middleware: Middleware) -> Self {
        Self::new(Some(Arc::new(self.clone())), [middleware])
    }

    /// Returns the middleware names, outermost first.
    pub fn middleware_names(&self) -> Vec<&str> {
        self.middlewares.iter().map(Middleware::name).collect()
    }

    /// Returns the middleware, outermost first.
    pub fn middlewares(&self) -> &[Middleware] {
        &self.middlewares
    }

    /// Returns the base transport.
    pub fn base(&self) -> &SharedTransport {
        &self.base
    }

    /// Returns the number of middleware layers.
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Returns `true` if the chain has no middleware.
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Converts the chain into a shared transport.
    pub fn into_shared(self) -> SharedTransport {
        Arc::new(self)
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("middlewares", &self.middlewares)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for Chain {
    async fn send(&self, request: Request) -> Result<reqwest::Response> {
        self.composed.send(request).await
    }

    fn as_chain(&self) -> Option<&Chain> {
        Some(self)
    }
}

/// Builds a chain and returns it as a shared transport.
///
/// Shorthand for `Chain::new(base, middlewares).into_shared()`.
pub fn chain(
    base: Option<SharedTransport>,
    middlewares: impl IntoIterator<Item = Middleware>,
) -> SharedTransport {
    Chain::new(base, middlewares).into_shared()
}

fn compose(base: &SharedTransport, middlewares: &[Middleware]) -> SharedTransport {
    middlewares
        .iter()
        .rev()
        .fold(Arc::clone(base), |next, middleware| middleware.wrap(next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport_fn;
    use http::Method;
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<String>>>;

    struct Recorder {
        label: &'static str,
        log: Log,
        next: SharedTransport,
    }

    #[async_trait]
    impl Transport for Recorder {
        async fn send(&self, mut request: Request) -> Result<reqwest::Response> {
            self.log.lock().unwrap().push(format!("{} pre", self.label));
            request
                .headers_mut()
                .append("x-seen-by", self.label.parse().unwrap());
            let outcome = self.next.send(request).await;
            self.log.lock().unwrap().push(format!("{} post", self.label));
            outcome
        }
    }

    fn recorder(label: &'static str, log: &Log) -> Middleware {
        let log = Arc::clone(log);
        Middleware::new(label, move |next| {
            Arc::new(Recorder {
                label,
                log: Arc::clone(&log),
                next,
            })
        })
    }

    fn base(log: &Log) -> SharedTransport {
        let log = Arc::clone(log);
        transport_fn(move |request: Request| {
            let seen: Vec<String> = request
                .headers()
                .get_all("x-seen-by")
                .iter()
                .map(|v| v.to_str().unwrap().to_string())
                .collect();
            log.lock().unwrap().push(format!("base {}", seen.join(",")));
            async move {
                Ok(reqwest::Response::from(
                    http::Response::builder().status(200).body("").unwrap(),
                ))
            }
        })
    }

    fn request() -> Request {
        Request::new(Method::GET, "http://example.test/").unwrap()
    }

    #[tokio::test]
    async fn test_first_middleware_is_outermost() {
        let log: Log = Arc::default();
        let chain = Chain::new(Some(base(&log)), [recorder("a", &log), recorder("b", &log)]);

        chain.send(request()).await.unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["a pre", "b pre", "base a,b", "b post", "a post"]
        );
    }

    #[tokio::test]
    async fn test_chain_on_chain_appends() {
        let log: Log = Arc::default();
        let inner = Chain::new(Some(base(&log)), [recorder("a", &log)]);
        let outer = Chain::new(Some(inner.into_shared()), [recorder("b", &log)]);

        assert_eq!(outer.middleware_names(), vec!["a", "b"]);
        assert_eq!(outer.len(), 2);

        outer.send(request()).await.unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            vec!["a pre", "b pre", "base a,b", "b post", "a post"]
        );
    }

    #[tokio::test]
    async fn test_with_adds_innermost_layer() {
        let log: Log = Arc::default();
        let chain = Chain::new(Some(base(&log)), [recorder("a", &log)]).with(recorder("c", &log));

        assert_eq!(chain.middleware_names(), vec!["a", "c"]);
        chain.send(request()).await.unwrap();
        assert_eq!(log.lock().unwrap()[2], "base a,c");
    }

    #[tokio::test]
    async fn test_empty_chain_forwards_to_base() {
        let log: Log = Arc::default();
        let chain = Chain::new(Some(base(&log)), []);
        assert!(chain.is_empty());

        let response = chain.send(request()).await.unwrap();
        assert_eq!(response.status().as_u16(), 200);
        assert_eq!(*log.lock().unwrap(), vec!["base "]);
    }

    #[test]
    fn test_default_base_is_substituted() {
        let chain = Chain::new(None, [Middleware::identity()]);
        assert_eq!(chain.middleware_names(), vec!["identity"]);
    }
}
