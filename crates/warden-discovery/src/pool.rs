//! Bounded-concurrency task pool
//!
//! Work items are spawned onto a `JoinSet` and gated by a semaphore holding
//! `limit` permits, so at most `limit` operations are in flight at once.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Apply `f` to every item with at most `limit` calls in flight
///
/// Returns one slot per item, in input order, whatever order the calls
/// finish in. A slot is `None` only when its task was cancelled before
/// completing. A `limit` of zero is treated as one. A panic in `f` is resumed
/// on the caller.
pub async fn map_limit<T, R, F, Fut>(items: Vec<T>, limit: usize, f: F) -> Vec<Option<R>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
{
    let count = items.len();
    let permits = Arc::new(Semaphore::new(limit.max(1)));
    let f = Arc::new(f);
    let mut tasks = JoinSet::new();

    for (index, item) in items.into_iter().enumerate() {
        let permits = permits.clone();
        let f = f.clone();
        tasks.spawn(async move {
            // The semaphore is never closed
            let _permit = permits.acquire_owned().await.ok();
            (index, f(item).await)
        });
    }

    collect_slots(tasks, count).await
}

/// Drain indexed results into their slots
async fn collect_slots<R: 'static>(
    mut tasks: JoinSet<(usize, R)>,
    count: usize,
) -> Vec<Option<R>> {
    let mut slots: Vec<Option<R>> = (0..count).map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, result)) => slots[index] = Some(result),
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => tracing::warn!(error = %e, "Pool task cancelled"),
        }
    }
    slots
}

/// Run `f` on every item with at most `limit` calls in flight
pub async fn for_each_limit<T, F, Fut>(items: Vec<T>, limit: usize, f: F)
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    map_limit(items, limit, f).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Deterministic pseudo-random delay so later items often finish first
    fn jitter(i: usize) -> Duration {
        Duration::from_millis(((i * 7919) % 13) as u64 + 1)
    }

    #[tokio::test]
    async fn test_map_limit_preserves_order() {
        for limit in [1, 2, 3, 10, 64] {
            let items: Vec<usize> = (0..40).collect();
            let results = map_limit(items, limit, |i| async move {
                tokio::time::sleep(jitter(i)).await;
                i * 2
            })
            .await;
            assert_eq!(results.len(), 40);
            assert!(
                results.iter().enumerate().all(|(i, r)| *r == Some(i * 2)),
                "limit {limit}"
            );
        }
    }

    #[tokio::test]
    async fn test_map_limit_bounds_in_flight() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (f_in, f_peak) = (in_flight.clone(), peak.clone());

        map_limit((0..30).collect(), 4, move |i: usize| {
            let in_flight = f_in.clone();
            let peak = f_peak.clone();
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(jitter(i)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }
        })
        .await;

        let peak = peak.load(Ordering::SeqCst);
        assert!(peak <= 4, "peak {peak}");
        assert!(peak >= 2);
    }

    #[tokio::test]
    async fn test_zero_limit_and_empty_input() {
        let results = map_limit(vec![1, 2, 3], 0, |i| async move { i + 1 }).await;
        assert_eq!(results, vec![Some(2), Some(3), Some(4)]);

        let empty: Vec<Option<u8>> = map_limit(Vec::<u8>::new(), 5, |i| async move { i }).await;
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_for_each_limit_visits_all() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        for_each_limit((0..25).collect::<Vec<u32>>(), 3, move |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        })
        .await;
        assert_eq!(seen.load(Ordering::SeqCst), 25);
    }

    #[tokio::test]
    async fn test_cancelled_task_keeps_its_slot() {
        let mut tasks = JoinSet::new();
        tasks.spawn(async { (0, "a") });
        tasks
            .spawn(async {
                std::future::pending::<()>().await;
                (1, "b")
            })
            .abort();
        tasks.spawn(async { (2, "c") });

        let slots = collect_slots(tasks, 3).await;
        assert_eq!(slots, vec![Some("a"), None, Some("c")]);
    }
}
