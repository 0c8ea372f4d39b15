// src/core/scheduler.rs

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Why a unit of work did not produce a value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UnitFailure {
    #[error("unit panicked: {0}")]
    Panicked(String),
    #[error("unit was cancelled before completing")]
    Cancelled,
}

/// Semaphore-gated fan-out runner.
///
/// Every unit is spawned up front, but a unit only starts running once it holds
/// one of `limit` permits, so at most `limit` units are ever in flight no matter
/// how many are queued. The permit is owned by the unit's task and is released
/// on every exit path, including a panic.
#[derive(Debug, Clone, Copy)]
pub struct BoundedScheduler {
    limit: usize,
}

impl BoundedScheduler {
    /// A limit of zero is raised to one.
    pub fn new(limit: usize) -> Self {
        Self { limit: limit.max(1) }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Runs `work` over every item and waits for all units to settle.
    ///
    /// Results come back in input order. A failing unit yields an `Err` in its own
    /// position and never cancels its siblings.
    pub async fn run<I, F, Fut, T>(&self, items: I, work: F) -> Vec<Result<T, UnitFailure>>
    where
        I: IntoIterator,
        F: Fn(I::Item) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.limit));
        let mut units = JoinSet::new();
        let mut queued = 0usize;

        for (index, item) in items.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let unit = work(item);
            units.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (index, Err(UnitFailure::Cancelled));
                };
                let outcome = AssertUnwindSafe(unit)
                    .catch_unwind()
                    .await
                    .map_err(|payload| UnitFailure::Panicked(panic_message(payload.as_ref())));
                (index, outcome)
            });
            queued += 1;
        }
        debug!(units = queued, limit = self.limit, "Dispatched bounded units.");

        let mut settled: Vec<Option<Result<T, UnitFailure>>> = (0..queued).map(|_| None).collect();
        while let Some(joined) = units.join_next().await {
            match joined {
                Ok((index, outcome)) => {
                    if let Err(failure) = &outcome {
                        warn!(index, error = %failure, "Bounded unit failed.");
                    }
                    settled[index] = Some(outcome);
                }
                Err(e) => warn!(error = %e, "Bounded unit task did not join."),
            }
        }

        settled
            .into_iter()
            .map(|slot| slot.unwrap_or(Err(UnitFailure::Cancelled)))
            .collect()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn never_exceeds_the_limit() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let scheduler = BoundedScheduler::new(3);

        let results = scheduler
            .run(0..20u64, |i| {
                let in_flight = Arc::clone(&in_flight);
                let peak = Arc::clone(&peak);
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5 + i % 3)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    i * 2
                }
            })
            .await;

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(in_flight.load(Ordering::SeqCst), 0);
        let values: Vec<u64> = results.into_iter().map(Result::unwrap).collect();
        assert_eq!(values, (0..20u64).map(|i| i * 2).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn a_panicking_unit_does_not_cancel_siblings_or_leak_its_slot() {
        let scheduler = BoundedScheduler::new(1);
        let results = scheduler
            .run(0..4u32, |i| async move {
                if i == 1 {
                    panic!("unit {i} exploded");
                }
                i
            })
            .await;

        assert_eq!(results.len(), 4);
        assert_eq!(results[0], Ok(0));
        assert_eq!(results[1], Err(UnitFailure::Panicked("unit 1 exploded".to_string())));
        assert_eq!(results[2], Ok(2));
        assert_eq!(results[3], Ok(3));
    }

    #[tokio::test]
    async fn zero_limit_is_treated_as_one() {
        let scheduler = BoundedScheduler::new(0);
        assert_eq!(scheduler.limit(), 1);
        let results = scheduler.run(["a", "b"], |s| async move { s.len() }).await;
        assert_eq!(results, vec![Ok(1), Ok(1)]);
    }

    #[tokio::test]
    async fn empty_input_settles_immediately() {
        let results = BoundedScheduler::new(4)
            .run(Vec::<u8>::new(), |b| async move { b })
            .await;
        assert!(results.is_empty());
    }
}
