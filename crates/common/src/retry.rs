use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

/// Delay shape between attempts.
#[derive(Debug, Clone, Copy)]
pub enum Backoff {
    /// Doubles the base delay after every failed attempt.
    Exponential(Duration),
    /// Waits `(attempt + 1) * step`; used by the forge file fetch.
    Linear(Duration),
}

impl Backoff {
    fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::Exponential(base) => {
                let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
                base.saturating_mul(factor)
            }
            Backoff::Linear(step) => step.saturating_mul(attempt + 1),
        }
    }
}

/// Runs `op` up to `attempts` times, sleeping between failures.
///
/// Any error is retried; callers bound the whole call with a deadline, so a
/// cancelled caller drops the in-flight attempt and the remaining sleeps.
pub async fn retry<T, F, Fut>(attempts: u32, backoff: Backoff, mut op: F) -> anyhow::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let mut last = None;

    for attempt in 0..attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => last = Some(err),
        }
        if attempt + 1 < attempts {
            sleep(backoff.delay(attempt)).await;
        }
    }

    Err(last.unwrap_or_else(|| anyhow::anyhow!("retry called with zero attempts")))
}
