//! Backoff for gateway calls.
//!
//! The write queue wraps every save in [`with_retry`] under
//! [`SavePolicy::Retry`](crate::sync::SavePolicy), and the HTTP gateway wraps
//! its document fetches with [`Backoff::FETCH`]. Only errors that
//! [`LexitrackError::is_transient`] accepts are retried; a stale revision is
//! an `Ok` outcome and never reaches this loop.

use std::future::Future;
use std::time::Duration;

use crate::error::{LexitrackError, Result};

const MAX_DELAY_MS: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub max_retries: usize,
    pub base_delay_ms: u64,
}

impl Backoff {
    /// Document fetches, which block the caller.
    pub const FETCH: Backoff = Backoff {
        max_retries: 2,
        base_delay_ms: 150,
    };

    pub fn new(max_retries: usize, base_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
        }
    }

    /// Delay before retry number `attempt + 1`: doubles each time, capped at 10s.
    pub fn delay(&self, attempt: usize) -> Duration {
        let factor = 2u64.saturating_pow(u32::try_from(attempt).unwrap_or(u32::MAX));
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor).min(MAX_DELAY_MS))
    }
}

/// Run `f` until it succeeds, fails permanently, or `backoff.max_retries`
/// retries are spent. `what` names the document in logs.
pub async fn with_retry<F, Fut, T>(backoff: Backoff, what: &str, f: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(val) => {
                if attempt > 0 {
                    tracing::debug!(what, retries = attempt, "succeeded after retry");
                }
                return Ok(val);
            }
            Err(e) if e.is_transient() && attempt < backoff.max_retries => {
                let delay = backoff.delay(attempt);
                attempt += 1;
                tracing::warn!(
                    what,
                    attempt,
                    max_retries = backoff.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "transient error, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
