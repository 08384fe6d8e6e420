// src/core/retry.rs — Bounded retry for fallible async operations
//
// The refinement step treats the oracle as unreliable: transient network
// failures and unparsable replies both surface as errors. Each caller gets a
// fixed attempt budget with the same inputs every attempt; no backoff,
// no concurrent attempts. Exhaustion propagates the last error.

use std::future::Future;

use crate::infra::errors::PipefixError;

/// Run `op` up to `attempts` times, returning the first success or the last
/// error after exactly `attempts` failures.
pub async fn retry_n<T, F, Fut>(attempts: usize, what: &str, mut op: F) -> Result<T, PipefixError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PipefixError>>,
{
    let mut last_error = None;

    for attempt in 1..=attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                tracing::warn!(attempt, attempts, what, "attempt failed: {e}");
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| PipefixError::Invariant(format!("retry_n({what}) called with zero attempts"))))
}
