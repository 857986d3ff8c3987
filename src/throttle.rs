//! Request pacing for rate-limited market-data providers.
//!
//! Free provider tiers reject bursts, so request starts are spaced by a fixed
//! interval. The default policy is one request at a time, 1.2 s apart.

use crate::error::{Cancelled, SourceError};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_SPACING: Duration = Duration::from_millis(1200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    /// Minimum time between two request starts.
    pub spacing: Duration,
    /// Requests allowed in flight at once; 0 is treated as 1.
    pub max_concurrent: usize,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            spacing: DEFAULT_SPACING,
            max_concurrent: 1,
        }
    }
}

impl FetchPolicy {
    pub fn sequential(spacing: Duration) -> Self {
        Self {
            spacing,
            max_concurrent: 1,
        }
    }

    pub fn pacer(&self) -> Pacer {
        Pacer::new(self.spacing)
    }
}

/// Hands out request slots at least `spacing` apart.
pub struct Pacer {
    spacing: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl Pacer {
    pub fn new(spacing: Duration) -> Self {
        Self {
            spacing,
            next_slot: Mutex::new(None),
        }
    }

    /// Waits for the next free slot. The first slot is immediate.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<(), Cancelled> {
        if cancel.is_cancelled() {
            return Err(Cancelled);
        }

        let slot = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next {
                Some(t) if t > now => t,
                _ => now,
            };
            *next = Some(slot + self.spacing);
            slot
        };

        tokio::select! {
            _ = cancel.cancelled() => Err(Cancelled),
            _ = sleep_until(slot) => Ok(()),
        }
    }
}

/// Runs `fetch` for every symbol under the pacer, keeping input order.
///
/// Individual fetch failures are returned alongside their symbol; only
/// cancellation aborts the whole batch.
pub async fn fetch_paced<T, F, Fut>(
    pacer: &Pacer,
    max_concurrent: usize,
    symbols: Vec<String>,
    cancel: &CancellationToken,
    fetch: F,
) -> Result<Vec<(String, Result<T, SourceError>)>, Cancelled>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<T, SourceError>>,
{
    let fetch = &fetch;
    stream::iter(symbols)
        .map(|symbol| async move {
            pacer.acquire(cancel).await?;
            let result = fetch(symbol.clone()).await;
            Ok::<_, Cancelled>((symbol, result))
        })
        .buffered(max_concurrent.max(1))
        .try_collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_requests_are_spaced() {
        let pacer = FetchPolicy::default().pacer();
        let cancel = CancellationToken::new();
        let starts = Arc::new(std::sync::Mutex::new(Vec::new()));
        let origin = Instant::now();

        let results = fetch_paced(
            &pacer,
            1,
            vec!["A".to_string(), "B".to_string(), "C".to_string()],
            &cancel,
            |symbol| {
                let starts = starts.clone();
                async move {
                    starts.lock().unwrap().push(Instant::now() - origin);
                    Ok(symbol.len())
                }
            },
        )
        .await
        .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[2].0, "C");
        let starts = starts.lock().unwrap().clone();
        assert_eq!(starts[0], Duration::ZERO);
        assert!(starts[1] >= DEFAULT_SPACING);
        assert!(starts[2] >= DEFAULT_SPACING * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_do_not_stop_the_batch() {
        let pacer = Pacer::new(Duration::from_millis(10));
        let cancel = CancellationToken::new();

        let results = fetch_paced(
            &pacer,
            2,
            vec!["OK".to_string(), "BAD".to_string(), "OK2".to_string()],
            &cancel,
            |symbol| async move {
                if symbol == "BAD" {
                    Err(SourceError::NotFound(symbol))
                } else {
                    Ok(1.0)
                }
            },
        )
        .await
        .unwrap();

        let symbols: Vec<_> = results.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(symbols, vec!["OK", "BAD", "OK2"]);
        assert!(results[1].1.is_err());
        assert!(results[2].1.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_further_requests() {
        let pacer = FetchPolicy::default().pacer();
        let cancel = CancellationToken::new();
        let issued = Arc::new(std::sync::Mutex::new(Vec::new()));

        let result = fetch_paced(
            &pacer,
            1,
            vec!["A".to_string(), "B".to_string(), "C".to_string()],
            &cancel,
            |symbol| {
                let issued = issued.clone();
                let cancel = cancel.clone();
                async move {
                    issued.lock().unwrap().push(symbol.clone());
                    // superseded right after the first request
                    cancel.cancel();
                    Ok(())
                }
            },
        )
        .await;

        assert_eq!(result.unwrap_err(), Cancelled);
        assert_eq!(issued.lock().unwrap().clone(), vec!["A".to_string()]);
    }
}
