//! Request logging, timing and debug dumps.

use crate::transport::{SharedTransport, Transport};
use crate::{Middleware, Request, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::Instant;

/// Options for the [`log_requests`] middleware.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogOptions {
    /// Log one line with method, URL, status and duration in the message.
    pub concise: bool,
    /// Attach a `curl` rendering of the request.
    pub curl: bool,
}

struct LogRequests {
    options: LogOptions,
    next: SharedTransport,
}

#[async_trait]
impl Transport for LogRequests {
    async fn send(&self, request: Request) -> Result<reqwest::Response> {
        let method = request.method().clone();
        let url = request.url().clone();
        let curl = self.options.curl.then(|| to_curl(&request));

        tracing::debug!(method = %method, url = %url, "Send request");

        let started = Instant::now();
        let outcome = self.next.send(request).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let status = outcome.as_ref().map(|r| r.status().as_u16()).unwrap_or(0);
        let error = outcome.as_ref().err().map(ToString::to_string);
        let succeeded = (200..400).contains(&status);

        if self.options.concise {
            let message = format!(
                "Send request: {} {} => HTTP {} ({}ms)",
                method, url, status, duration_ms
            );
            if succeeded {
                tracing::info!(error = error.as_deref(), curl = curl.as_deref(), "{}", message);
            } else {
                tracing::error!(error = error.as_deref(), curl = curl.as_deref(), "{}", message);
            }
        } else if succeeded {
            tracing::info!(
                method = %method,
                url = %url,
                status,
                duration_ms,
                error = error.as_deref(),
                curl = curl.as_deref(),
                "Send request"
            );
        } else {
            tracing::error!(
                method = %method,
                url = %url,
                status,
                duration_ms,
                error = error.as_deref(),
                curl = curl.as_deref(),
                "Send request"
            );
        }

        outcome
    }
}

/// Logs every exchange: a debug line before sending, then an info line for
/// 2xx/3xx responses or an error line otherwise.
///
/// A missing response is logged as status 0.
pub fn log_requests(options: LogOptions) -> Middleware {
    Middleware::new("log-requests", move |next| {
        Arc::new(LogRequests { options, next })
    })
}

struct RequestTimer {
    next: SharedTransport,
}

#[async_trait]
impl Transport for RequestTimer {
    async fn send(&self, request: Request) -> Result<reqwest::Response> {
        let started = Instant::now();
        let outcome = self.next.send(request).await;
        tracing::debug!(
            duration_ms = started.elapsed().as_millis() as u64,
            "Request duration"
        );
        outcome
    }
}

/// Logs the duration of every exchange at debug level.
pub fn request_timer() -> Middleware {
    Middleware::new("request-timer", |next| Arc::new(RequestTimer { next }))
}

struct Debug {
    next: SharedTransport,
}

#[async_trait]
impl Transport for Debug {
    async fn send(&self, request: Request) -> Result<reqwest::Response> {
        let method = request.method().clone();
        let url = request.url().clone();
        let curl = to_curl(&request);

        let outcome = self.next.send(request).await;

        tracing::debug!(method = %method, url = %url, "Request");
        match &outcome {
            Ok(response) => {
                tracing::debug!(status = %response.status(), url = %response.url(), "Response")
            }
            Err(error) => tracing::debug!(error = %error, "No response"),
        }
        tracing::debug!(curl = %curl, "Request as curl");

        outcome
    }
}

/// Dumps every exchange at debug level once it completes: the request line,
/// the response status (when there is one) and a `curl` rendering.
pub fn debug() -> Middleware {
    Middleware::new("debug", |next| Arc::new(Debug { next }))
}

struct DebugRequestBody {
    next: SharedTransport,
}

#[async_trait]
impl Transport for DebugRequestBody {
    async fn send(&self, request: Request) -> Result<reqwest::Response> {
        match request.body().map(|b| b.as_bytes()) {
            Some(Some(bytes)) => tracing::debug!(
                len = bytes.len(),
                body = %String::from_utf8_lossy(bytes),
                "Request body"
            ),
            Some(None) => tracing::debug!("Request body is streamed, not logged"),
            None => tracing::debug!(len = 0, "Request body"),
        }
        self.next.send(request).await
    }
}

/// Logs the length and text of the request body at debug level before
/// forwarding it unchanged.
///
/// Only in-memory bodies are inspected, so the body stays available to the
/// next transport and to retries.
pub fn debug_request_body() -> Middleware {
    Middleware::new("debug-request-body", |next| {
        Arc::new(DebugRequestBody { next })
    })
}

/// Renders the request as a `curl` command line.
///
/// Only in-memory UTF-8 bodies are included.
///
/// # Examples
///
/// ```
/// use transport_chain::{middleware::to_curl, Request};
/// use http::Method;
///
/// let request = Request::new(Method::POST, "https://api.example.com/users")
///     .unwrap()
///     .with_body("{}");
/// assert_eq!(
///     to_curl(&request),
///     "curl -X 'POST' -d '{}' 'https://api.example.com/users'"
/// );
/// ```
pub fn to_curl(request: &Request) -> String {
    let mut parts = vec!["curl".to_string(), "-X".to_string(), quote(request.method().as_str())];

    for (name, value) in request.headers() {
        if let Ok(value) = value.to_str() {
            parts.push("-H".to_string());
            parts.push(quote(&format!("{}: {}", name, value)));
        }
    }

    let body = request
        .body()
        .and_then(|b| b.as_bytes())
        .and_then(|b| std::str::from_utf8(b).ok());
    if let Some(body) = body {
        parts.push("-d".to_string());
        parts.push(quote(body));
    }

    parts.push(quote(request.url().as_str()));
    parts.join(" ")
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{chain, transport_fn, Error};
    use http::Method;

    #[tokio::test]
    async fn test_log_requests_passes_outcome_through() {
        let base = transport_fn(|_request: Request| async {
            Ok(reqwest::Response::from(http::Response::builder().status(502).body("").unwrap()))
        });
        let transport = chain(
            Some(base),
            [
                log_requests(LogOptions { concise: true, curl: true }),
                log_requests(LogOptions::default()),
                request_timer(),
            ],
        );

        let request = Request::new(Method::GET, "http://example.test/").unwrap();
        let response = transport.send(request).await.unwrap();
        assert_eq!(response.status().as_u16(), 502);
    }

    #[tokio::test]
    async fn test_log_requests_passes_errors_through() {
        let base = transport_fn(|_request: Request| async {
            Err::<reqwest::Response, _>(Error::Cancelled { last_status: None })
        });
        let transport = chain(Some(base), [log_requests(LogOptions::default())]);

        let request = Request::new(Method::GET, "http://example.test/").unwrap();
        assert!(transport.send(request).await.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn test_debug_passes_outcome_through() {
        let base = transport_fn(|_request: Request| async {
            Ok(reqwest::Response::from(http::Response::builder().status(404).body("").unwrap()))
        });
        let transport = chain(Some(base), [debug()]);

        let request = Request::new(Method::DELETE, "http://example.test/items/1").unwrap();
        let response = transport.send(request).await.unwrap();
        assert_eq!(response.status().as_u16(), 404);
    }

    #[tokio::test]
    async fn test_debug_passes_errors_through() {
        let base = transport_fn(|_request: Request| async {
            Err::<reqwest::Response, _>(Error::Cancelled {
                last_status: Some(http::StatusCode::SERVICE_UNAVAILABLE),
            })
        });
        let transport = chain(Some(base), [debug()]);

        let request = Request::new(Method::GET, "http://example.test/").unwrap();
        let error = transport.send(request).await.unwrap_err();
        assert_eq!(error.status().map(|s| s.as_u16()), Some(503));
    }

    #[tokio::test]
    async fn test_debug_request_body_forwards_body_unchanged() {
        let seen = Arc::new(std::sync::Mutex::new(None));
        let recorder = Arc::clone(&seen);
        let base = transport_fn(move |request: Request| {
            let body = request.body().and_then(|b| b.as_bytes()).map(|b| b.to_vec());
            *recorder.lock().unwrap() = body;
            async { Ok(reqwest::Response::from(http::Response::builder().body("").unwrap())) }
        });
        let transport = chain(Some(base), [debug_request_body(), debug()]);

        let request = Request::new(Method::POST, "http://example.test/notes")
            .unwrap()
            .with_body("{\"text\":\"héllo\"}");
        transport.send(request).await.unwrap();

        assert_eq!(
            seen.lock().unwrap().as_deref(),
            Some("{\"text\":\"héllo\"}".as_bytes())
        );
    }

    #[tokio::test]
    async fn test_debug_request_body_without_body() {
        let base = transport_fn(|request: Request| async move {
            assert!(request.body().is_none());
            Ok(reqwest::Response::from(http::Response::builder().status(204).body("").unwrap()))
        });
        let transport = chain(Some(base), [debug_request_body()]);

        let request = Request::new(Method::GET, "http://example.test/").unwrap();
        assert_eq!(transport.send(request).await.unwrap().status().as_u16(), 204);
    }

    #[test]
    fn test_curl_includes_headers_and_escapes_quotes() {
        let request = Request::new(Method::PUT, "http://example.test/notes")
            .unwrap()
            .with_header("x-note", "it's")
            .unwrap()
            .with_body("a'b");

        assert_eq!(
            to_curl(&request),
            r"curl -X 'PUT' -H 'x-note: it'\''s' -d 'a'\''b' 'http://example.test/notes'"
        );
    }
}
