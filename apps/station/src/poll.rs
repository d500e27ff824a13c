//! The one polling primitive the station uses for confirmation waits and
//! post-delegation verification: fixed interval, bounded attempts,
//! cancellable between reads.

use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_POLL_ATTEMPTS: u32 = 10;

#[derive(Debug)]
pub enum PollOutcome<T> {
    /// `accept` matched; holds the matching value.
    Satisfied(T),
    /// All attempts exhausted; holds the last successful read, if any.
    Exhausted(Option<T>),
    Cancelled,
}

impl<T> PollOutcome<T> {
    pub fn satisfied(&self) -> bool {
        matches!(self, PollOutcome::Satisfied(_))
    }

    pub fn last(self) -> Option<T> {
        match self {
            PollOutcome::Satisfied(v) => Some(v),
            PollOutcome::Exhausted(v) => v,
            PollOutcome::Cancelled => None,
        }
    }
}

/// Reads until `accept` matches, the attempts run out, or `cancel` fires.
/// Read errors are tolerated; the next tick retries.
pub async fn poll_until<T, F, Fut, P>(
    cancel: &CancellationToken,
    interval: Duration,
    attempts: u32,
    mut read: F,
    mut accept: P,
) -> PollOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
    P: FnMut(&T) -> bool,
{
    let mut last = None;
    for attempt in 0..attempts.max(1) {
        if attempt > 0 {
            tokio::select! {
                _ = cancel.cancelled() => return PollOutcome::Cancelled,
                _ = tokio::time::sleep(interval) => {}
            }
        }
        if cancel.is_cancelled() {
            return PollOutcome::Cancelled;
        }

        match read().await {
            Ok(value) => {
                if accept(&value) {
                    return PollOutcome::Satisfied(value);
                }
                last = Some(value);
            }
            Err(err) => {
                tracing::debug!(attempt, err = %err, "poll read failed");
            }
        }
    }
    PollOutcome::Exhausted(last)
}
