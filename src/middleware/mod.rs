//! Stateless middleware sharing the chain's composition contract.
//!
//! Header setters, conditional wrapping, artificial delay, request logging and
//! debug dumps.
//! Each constructor returns a [`Middleware`] ready to be placed in a
//! [`Chain`](crate::Chain).

mod delay;
mod header;
mod log;

pub use delay::{delayed, DelayConfig};
pub use header::{authorization, set_header, set_header_with, user_agent};
pub use log::{debug, debug_request_body, log_requests, request_timer, to_curl, LogOptions};

use crate::Middleware;

/// Returns `middleware` when `condition` holds, otherwise a pass-through.
///
/// # Examples
///
/// ```
/// use transport_chain::middleware::{set_header, when};
///
/// # fn example() -> Result<(), transport_chain::Error> {
/// let debug = std::env::var("API_DEBUG").is_ok();
/// let layer = when(debug, set_header("x-debug", "true")?);
/// # Ok(())
/// # }
/// ```
pub fn when(condition: bool, middleware: Middleware) -> Middleware {
    if condition {
        middleware
    } else {
        Middleware::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_when_picks_middleware() {
        let header = set_header("x-debug", "true").unwrap();
        assert_eq!(when(true, header.clone()).name(), "set-header");
        assert_eq!(when(false, header).name(), "identity");
    }
}
