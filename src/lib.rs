//! # transport-chain - composable middleware around an HTTP transport
//!
//! transport-chain layers independent behaviors (retry with backoff, header
//! injection, request logging, artificial delay) onto a base HTTP transport
//! without touching call sites. The base transport is any [`Transport`];
//! `reqwest::Client` is the default.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use transport_chain::{chain, middleware, retry, Request, SharedTransport, Transport};
//! use http::Method;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), transport_chain::Error> {
//!     let base: SharedTransport = Arc::new(reqwest::Client::new());
//!
//!     // The first middleware is outermost: it sees the request first.
//!     let transport = chain(
//!         Some(base.clone()),
//!         [
//!             middleware::user_agent("my-app/1.0")?,
//!             retry(base, 5),
//!             middleware::log_requests(middleware::LogOptions::default()),
//!         ],
//!     );
//!
//!     let request = Request::new(Method::GET, "https://api.example.com/users/123")?;
//!     let response = transport.send(request).await?;
//!     println!("Status: {}", response.status());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Ordering
//!
//! `chain(base, [a, b, c])` is `a(b(c(base)))`. The retry middleware sends its
//! first attempt through the layers registered after it, but replays failed
//! attempts directly against the transport it was given. In the example above
//! `log_requests` therefore logs only the first attempt, while the
//! `User-Agent` header set before `retry` is present on every attempt.
//!
//! ## Retries
//!
//! A failed exchange is retried when it is a transport error other than a
//! redirect limit, unsupported scheme or untrusted certificate, or when the
//! response status is 429 or any 5xx except 501. Waits grow as
//! `min * 2^attempt` (2s, 4s, 8s, 16s with the defaults), except that a
//! `Retry-After` header on a 429 or 503 is honored exactly. Every wait races the
//! request's [`Cancellation`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use transport_chain::{
//!     chain, Cancellation, Error, Request, Retry, SharedTransport, Transport,
//! };
//! use http::Method;
//!
//! # async fn example() -> Result<(), Error> {
//! let base: SharedTransport = Arc::new(reqwest::Client::new());
//! let retry = Retry::builder(base.clone())
//!     .max_retries(3)
//!     .max_backoff(Duration::from_secs(8))
//!     .build()?;
//! let transport = chain(Some(base), [retry.middleware()]);
//!
//! let cancellation = Cancellation::new().with_timeout(Duration::from_secs(30));
//! let request = Request::new(Method::GET, "https://api.example.com/report")?
//!     .with_cancellation(cancellation);
//!
//! match transport.send(request).await {
//!     Ok(response) if response.status().is_success() => println!("done"),
//!     // Exhausted retries hand back the last response as-is.
//!     Ok(response) => eprintln!("gave up with status {}", response.status()),
//!     Err(Error::Cancelled { .. }) => eprintln!("timed out"),
//!     Err(e) => eprintln!("failed: {}", e),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Request bodies are replayed with [`Request::try_clone`]. Streaming bodies
//! cannot be replayed, so such requests get a single attempt.

mod backoff;
mod cancel;
mod chain;
pub mod classify;
mod error;
pub mod events;
pub mod middleware;
mod request;
mod retry;
mod transport;

pub use backoff::{retry_after, Backoff, DEFAULT_MAX_BACKOFF, DEFAULT_MIN_BACKOFF};
pub use cancel::Cancellation;
pub use chain::{chain, Chain, Middleware};
pub use error::{Error, Result};
pub use request::Request;
pub use retry::{retry, Retry, RetryBuilder, RetryConfig};
pub use transport::{default_transport, transport_fn, SharedTransport, Transport, TransportFn};
