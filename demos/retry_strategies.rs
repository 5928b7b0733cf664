//! Example demonstrating retry configuration and middleware ordering.
//!
//! This example shows how to:
//! - Build a chain with a retry layer and header middleware
//! - Tune backoff bounds and collect retry events
//! - Bound the whole exchange with a deadline
//!
//! Run with: `cargo run --example retry_strategies`

use std::sync::Arc;
use std::time::Duration;
use transport_chain::events::RetryEvent;
use transport_chain::middleware::{self, LogOptions};
use transport_chain::{
    chain, retry, Cancellation, Error, Request, Retry, SharedTransport, Transport,
};
use http::Method;

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize tracing to see retry attempts
    tracing_subscriber::fmt()
        .with_env_filter("transport_chain=debug,retry_strategies=info")
        .init();

    let base: SharedTransport = Arc::new(reqwest::Client::new());

    println!("=== Default Retry (1s * 2^attempt, capped at 16s) ===");
    let transport = chain(
        Some(base.clone()),
        [
            middleware::user_agent("transport-chain-demo/0.1")?,
            retry(base.clone(), 3),
            middleware::log_requests(LogOptions {
                concise: true,
                curl: true,
            }),
        ],
    );

    let request = Request::new(Method::GET, "https://httpbin.org/status/200")?;
    match transport.send(request).await {
        Ok(response) => println!("Status: {}", response.status()),
        Err(e) => println!("Failed: {}", e),
    }
    println!();

    println!("=== Tuned Backoff with Event Sink ===");
    let tuned = Retry::builder(base.clone())
        .max_retries(2)
        .min_backoff(Duration::from_millis(100))
        .max_backoff(Duration::from_secs(1))
        .event_sink(|event: &RetryEvent| {
            println!(
                "  retry #{} after {:?}: status {:?} ({:?})",
                event.attempt, event.wait, event.status, event.outcome
            );
        })
        .build()?;
    let transport = chain(Some(base.clone()), [tuned.middleware()]);

    // Always 503: retries are exhausted and the last response comes back as-is.
    let request = Request::new(Method::GET, "https://httpbin.org/status/503")?;
    match transport.send(request).await {
        Ok(response) => println!("Final status after retries: {}", response.status()),
        Err(e) => println!("Failed: {}", e),
    }
    println!();

    println!("=== Deadline Shorter Than Backoff ===");
    let transport = chain(Some(base.clone()), [retry(base, 5)]);
    let cancellation = Cancellation::new().with_timeout(Duration::from_secs(1));
    let request = Request::new(Method::GET, "https://httpbin.org/status/500")?
        .with_cancellation(cancellation);

    match transport.send(request).await {
        Ok(response) => println!("Status: {}", response.status()),
        Err(Error::Cancelled { last_status }) => {
            println!("Cancelled while waiting, last status: {:?}", last_status)
        }
        Err(e) => println!("Failed: {}", e),
    }

    Ok(())
}
