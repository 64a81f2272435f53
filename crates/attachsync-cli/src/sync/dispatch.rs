//! Work dispatch for records, fields and files
//!
//! Every fan-out point in the pipeline runs its units of work through a
//! [`DispatchPolicy`]. Concurrent work is polled on the calling task; nothing
//! is spawned, so no unit of work outlives the call that dispatched it.

use futures::stream::{self, StreamExt};
use std::future::Future;
use std::num::NonZeroUsize;

/// How a batch of independent units of work is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchPolicy {
    /// One unit at a time, in order
    #[default]
    Sequential,
    /// All units in flight at once, or at most `max_in_flight` per batch
    Concurrent { max_in_flight: Option<NonZeroUsize> },
}

impl DispatchPolicy {
    /// Policy for the CLI's `--parallel` / `--max-concurrency` flags
    pub fn from_flags(parallel: bool, max_concurrency: Option<NonZeroUsize>) -> Self {
        if parallel || max_concurrency.is_some() {
            DispatchPolicy::Concurrent {
                max_in_flight: max_concurrency,
            }
        } else {
            DispatchPolicy::Sequential
        }
    }

    pub fn is_concurrent(&self) -> bool {
        matches!(self, DispatchPolicy::Concurrent { .. })
    }

    /// Run `work` for every item and collect the results.
    ///
    /// Sequential dispatch returns results in item order. Concurrent dispatch
    /// makes no ordering promise when bounded.
    pub async fn run<I, F, Fut, T>(self, items: I, mut work: F) -> Vec<T>
    where
        I: IntoIterator,
        F: FnMut(I::Item) -> Fut,
        Fut: Future<Output = T>,
    {
        match self {
            DispatchPolicy::Sequential => {
                let mut results = Vec::new();
                for item in items {
                    results.push(work(item).await);
                }
                results
            },
            DispatchPolicy::Concurrent {
                max_in_flight: None,
            } => futures::future::join_all(items.into_iter().map(work)).await,
            DispatchPolicy::Concurrent {
                max_in_flight: Some(limit),
            } => {
                stream::iter(items)
                    .map(work)
                    .buffer_unordered(limit.get())
                    .collect()
                    .await
            },
        }
    }
}

impl std::fmt::Display for DispatchPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchPolicy::Sequential => write!(f, "sequential"),
            DispatchPolicy::Concurrent {
                max_in_flight: None,
            } => write!(f, "concurrent"),
            DispatchPolicy::Concurrent {
                max_in_flight: Some(limit),
            } => write!(f, "concurrent (max {} in flight)", limit),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Tracks how many units are running at once
    #[derive(Default)]
    struct Gauge {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    impl Gauge {
        async fn work(&self, item: usize) -> usize {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::task::yield_now().await;
            tokio::task::yield_now().await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            item * 10
        }

        fn peak(&self) -> usize {
            self.peak.load(Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn test_sequential_runs_in_order_one_at_a_time() {
        let gauge = Arc::new(Gauge::default());
        let results = DispatchPolicy::Sequential
            .run(0..5, |i| {
                let gauge = gauge.clone();
                async move { gauge.work(i).await }
            })
            .await;

        assert_eq!(results, vec![0, 10, 20, 30, 40]);
        assert_eq!(gauge.peak(), 1);
    }

    #[tokio::test]
    async fn test_unbounded_concurrency_overlaps_work() {
        let gauge = Arc::new(Gauge::default());
        let policy = DispatchPolicy::Concurrent {
            max_in_flight: None,
        };
        let results = policy
            .run(0..5, |i| {
                let gauge = gauge.clone();
                async move { gauge.work(i).await }
            })
            .await;

        assert_eq!(results, vec![0, 10, 20, 30, 40]);
        assert_eq!(gauge.peak(), 5);
    }

    #[tokio::test]
    async fn test_bounded_concurrency_respects_limit() {
        let gauge = Arc::new(Gauge::default());
        let policy = DispatchPolicy::from_flags(true, NonZeroUsize::new(2));
        let mut results = policy
            .run(0..6, |i| {
                let gauge = gauge.clone();
                async move { gauge.work(i).await }
            })
            .await;

        results.sort_unstable();
        assert_eq!(results, vec![0, 10, 20, 30, 40, 50]);
        assert_eq!(gauge.peak(), 2);
    }

    #[test]
    fn test_from_flags() {
        assert_eq!(DispatchPolicy::from_flags(false, None), DispatchPolicy::Sequential);
        assert_eq!(
            DispatchPolicy::from_flags(true, None),
            DispatchPolicy::Concurrent {
                max_in_flight: None
            }
        );
        assert!(DispatchPolicy::from_flags(false, NonZeroUsize::new(4)).is_concurrent());
    }
}
