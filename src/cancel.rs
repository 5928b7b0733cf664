//! Cancellation signals carried alongside requests.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// A cloneable cancellation signal attached to a [`Request`](crate::Request).
///
/// Every clone observes the same signal. An optional deadline makes the signal
/// fire on its own once the deadline passes. Middleware that waits (retry
/// backoff, artificial delay) races its timer against [`Cancellation::cancelled`].
///
/// # Examples
///
/// ```
/// use transport_chain::Cancellation;
///
/// let cancellation = Cancellation::new();
/// let observer = cancellation.clone();
///
/// cancellation.cancel();
/// assert!(observer.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct Cancellation {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
    deadline: Option<Instant>,
}

impl Cancellation {
    /// Creates a signal that only fires when [`cancel`](Self::cancel) is called.
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
            deadline: None,
        }
    }

    /// Returns a clone of this signal that additionally fires after `timeout`.
    ///
    /// An earlier existing deadline is kept. A timeout too large to represent
    /// adds no deadline. Calling `cancel` on either the original or the
    /// returned signal cancels both.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = match (self.deadline, Instant::now().checked_add(timeout)) {
            (Some(existing), Some(candidate)) => Some(existing.min(candidate)),
            (existing, None) => existing,
            (None, candidate) => candidate,
        };
        Self {
            tx: Arc::clone(&self.tx),
            rx: self.rx.clone(),
            deadline,
        }
    }

    /// Fires the signal. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Returns `true` once the signal has fired or the deadline has passed.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Returns the deadline, if one was set.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Completes when the signal fires or the deadline passes.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = wait_for_cancel(&mut rx) => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => wait_for_cancel(&mut rx).await,
        }
    }
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}

async fn wait_for_cancel(rx: &mut watch::Receiver<bool>) {
    // The sender lives as long as any clone of the signal, so an error here
    // means nobody can cancel anymore.
    if rx.wait_for(|cancelled| *cancelled).await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancel_is_shared_between_clones() {
        let cancellation = Cancellation::new();
        let observer = cancellation.clone();
        assert!(!observer.is_cancelled());

        let waiter = tokio::spawn(async move { observer.cancelled().await });
        cancellation.cancel();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("cancelled() should complete")
            .unwrap();
        assert!(cancellation.is_cancelled());
    }

    #[tokio::test]
    async fn test_deadline_fires_without_cancel() {
        let cancellation = Cancellation::new().with_timeout(Duration::from_millis(20));
        assert!(!cancellation.is_cancelled());

        let start = std::time::Instant::now();
        cancellation.cancelled().await;
        assert!(start.elapsed() >= Duration::from_millis(15));
        assert!(cancellation.is_cancelled());
    }

    #[tokio::test]
    async fn test_with_timeout_keeps_earlier_deadline() {
        let short = Cancellation::new().with_timeout(Duration::from_millis(10));
        let long = short.with_timeout(Duration::from_secs(60));
        assert_eq!(short.deadline(), long.deadline());
    }

    #[tokio::test]
    async fn test_unrepresentable_timeout_adds_no_deadline() {
        let unbounded = Cancellation::new().with_timeout(Duration::MAX);
        assert_eq!(unbounded.deadline(), None);
        assert!(!unbounded.is_cancelled());

        let short = Cancellation::new().with_timeout(Duration::from_secs(5));
        let still_short = short.with_timeout(Duration::MAX);
        assert_eq!(short.deadline(), still_short.deadline());
    }

    #[tokio::test]
    async fn test_cancel_reaches_timed_clone() {
        let cancellation = Cancellation::new();
        let timed = cancellation.with_timeout(Duration::from_secs(60));
        cancellation.cancel();
        assert!(timed.is_cancelled());
    }
}
