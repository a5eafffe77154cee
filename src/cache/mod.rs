//! Memoization with single-flight coalescing for derived aggregates.
//!
//! Full-history aggregation re-reads every snapshot, but the timeline only
//! changes once per day, so each view keeps a single memoized result keyed
//! by the exact timeline content (plus request parameters where relevant).
//! Per key the slot moves through EMPTY -> COMPUTING -> READY:
//!
//! - READY for the requested key: served immediately, no recomputation.
//! - COMPUTING for the requested key: concurrent callers get the previous
//!   READY value if it answers the same logical query (stale while
//!   revalidating), otherwise they await the in-flight computation's
//!   shared result.
//! - A failed computation reverts the slot; the error goes to the caller
//!   that started the computation, and any previous READY value survives.
//!
//! Storing a result under a new key drops the old one, which is exactly the
//! invalidation the daily snapshot append needs.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{watch, Mutex};

use crate::errors::AppError;

/// Cache key: a request-parameters part that must match exactly and a
/// timeline-identity part that is allowed to be stale.
pub trait CacheKey: Clone + PartialEq {
    /// Whether `other` answers the same logical query, possibly against an
    /// older timeline. Only such entries may be served as stale fallbacks.
    fn same_query(&self, other: &Self) -> bool;
}

/// Timeline-only keys: the whole key is the timeline identity, so any prior
/// result is the same view, just older.
impl CacheKey for Vec<i64> {
    fn same_query(&self, _other: &Self) -> bool {
        true
    }
}

/// Range queries keyed by `(timeline, start, end)`.
impl CacheKey for (Vec<i64>, i64, i64) {
    fn same_query(&self, other: &Self) -> bool {
        self.1 == other.1 && self.2 == other.2
    }
}

/// Chart queries keyed by `(timeline, start, end, usernames)`.
impl CacheKey for (Vec<i64>, i64, i64, Vec<String>) {
    fn same_query(&self, other: &Self) -> bool {
        self.1 == other.1 && self.2 == other.2 && self.3 == other.3
    }
}

struct InFlight<K, V> {
    key: K,
    /// Distinguishes this computation from a later one under the same slot.
    token: u64,
    rx: watch::Receiver<Option<Arc<V>>>,
}

struct CacheState<K, V> {
    ready: Option<(K, Arc<V>)>,
    in_flight: Option<InFlight<K, V>>,
    next_token: u64,
}

/// Single-slot memo with request coalescing.
pub struct RecomputeCache<K, V> {
    state: Mutex<CacheState<K, V>>,
}

impl<K, V> Default for RecomputeCache<K, V> {
    fn default() -> Self {
        Self {
            state: Mutex::new(CacheState {
                ready: None,
                in_flight: None,
                next_token: 0,
            }),
        }
    }
}

impl<K, V> RecomputeCache<K, V>
where
    K: CacheKey,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `key`, computing it at most once across
    /// concurrent callers.
    pub async fn get_or_compute<F, Fut>(&self, key: K, compute: F) -> Result<Arc<V>, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, AppError>>,
    {
        let (tx, token) = {
            let mut state = self.state.lock().await;

            if let Some((cached_key, value)) = &state.ready {
                if *cached_key == key {
                    return Ok(Arc::clone(value));
                }
            }

            if let Some(in_flight) = &state.in_flight {
                if in_flight.key == key {
                    // Serve stale data while the recompute runs, but only
                    // for the same logical query; callers with nothing to
                    // fall back on wait for the result.
                    if let Some((stale_key, stale)) = &state.ready {
                        if key.same_query(stale_key) {
                            tracing::debug!("Serving stale aggregate during recompute");
                            return Ok(Arc::clone(stale));
                        }
                    }
                    let rx = in_flight.rx.clone();
                    drop(state);
                    return Self::wait(rx).await;
                }
            }

            let (tx, rx) = watch::channel(None);
            let token = state.next_token;
            state.next_token += 1;
            state.in_flight = Some(InFlight {
                key: key.clone(),
                token,
                rx,
            });
            (tx, token)
        };

        match compute().await {
            Ok(value) => {
                let value = Arc::new(value);
                let mut state = self.state.lock().await;
                // A later computation may own the slot by now; its result
                // will be fresher, so only the owner publishes to the memo.
                if state
                    .in_flight
                    .as_ref()
                    .is_some_and(|f| f.token == token)
                {
                    state.ready = Some((key, Arc::clone(&value)));
                    state.in_flight = None;
                }
                let _ = tx.send(Some(Arc::clone(&value)));
                Ok(value)
            }
            Err(err) => {
                let mut state = self.state.lock().await;
                if state
                    .in_flight
                    .as_ref()
                    .is_some_and(|f| f.token == token)
                {
                    state.in_flight = None;
                }
                drop(state);
                tracing::error!("Aggregate recomputation failed: {}", err);
                // Dropping the sender wakes waiters with a closed channel.
                drop(tx);
                Err(err)
            }
        }
    }

    async fn wait(mut rx: watch::Receiver<Option<Arc<V>>>) -> Result<Arc<V>, AppError> {
        loop {
            if let Some(value) = rx.borrow_and_update().as_ref() {
                return Ok(Arc::clone(value));
            }
            if rx.changed().await.is_err() {
                // The sender may have published right before dropping.
                if let Some(value) = rx.borrow().as_ref() {
                    return Ok(Arc::clone(value));
                }
                return Err(AppError::Computation(
                    "Aggregate data temporarily unavailable: recomputation failed".to_string(),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use tokio::sync::Notify;

    #[tokio::test]
    async fn ready_hit_skips_recompute() {
        let cache: RecomputeCache<Vec<i64>, i64> = RecomputeCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_compute(vec![1, 2, 3], || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(42)
                })
                .await
                .unwrap();
            assert_eq!(*value, 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn new_key_invalidates_old_result() {
        let cache: RecomputeCache<Vec<i64>, i64> = RecomputeCache::new();

        let first = cache
            .get_or_compute(vec![1], || async { Ok(1) })
            .await
            .unwrap();
        assert_eq!(*first, 1);

        // Appending a snapshot changes the timeline identity.
        let second = cache
            .get_or_compute(vec![1, 2], || async { Ok(2) })
            .await
            .unwrap();
        assert_eq!(*second, 2);

        // The old key is gone: requesting it computes again.
        let calls = AtomicUsize::new(0);
        cache
            .get_or_compute(vec![1], || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(1)
            })
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_computation() {
        let cache: Arc<RecomputeCache<Vec<i64>, i64>> = Arc::new(RecomputeCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_compute(vec![1, 2], move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(7)
                    })
                    .await
                    .unwrap()
            }));
        }

        for handle in handles {
            assert_eq!(*handle.await.unwrap(), 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stale_value_served_while_revalidating() {
        let cache: Arc<RecomputeCache<Vec<i64>, i64>> = Arc::new(RecomputeCache::new());
        cache
            .get_or_compute(vec![1], || async { Ok(1) })
            .await
            .unwrap();

        let release = Arc::new(Notify::new());
        let started = Arc::new(Notify::new());

        let slow = {
            let cache = Arc::clone(&cache);
            let release = Arc::clone(&release);
            let started = Arc::clone(&started);
            tokio::spawn(async move {
                cache
                    .get_or_compute(vec![1, 2], move || async move {
                        started.notify_one();
                        release.notified().await;
                        Ok(2)
                    })
                    .await
                    .unwrap()
            })
        };

        started.notified().await;

        // While the recompute is in flight, the previous result is served.
        let stale = cache
            .get_or_compute(vec![1, 2], || async { Ok(99) })
            .await
            .unwrap();
        assert_eq!(*stale, 1);

        release.notify_one();
        assert_eq!(*slow.await.unwrap(), 2);

        // Once ready, the fresh value wins.
        let fresh = cache
            .get_or_compute(vec![1, 2], || async { Ok(99) })
            .await
            .unwrap();
        assert_eq!(*fresh, 2);
    }

    #[tokio::test]
    async fn stale_fallback_never_crosses_query_params() {
        let cache: Arc<RecomputeCache<(Vec<i64>, i64, i64), i64>> = Arc::new(RecomputeCache::new());
        let timeline = vec![1, 2, 3];

        // A cached comparison for the (0, 3) range.
        cache
            .get_or_compute((timeline.clone(), 0, 3), || async { Ok(111) })
            .await
            .unwrap();

        let release = Arc::new(Notify::new());
        let started = Arc::new(Notify::new());

        let slow = {
            let cache = Arc::clone(&cache);
            let timeline = timeline.clone();
            let release = Arc::clone(&release);
            let started = Arc::clone(&started);
            tokio::spawn(async move {
                cache
                    .get_or_compute((timeline, 5, 10), move || async move {
                        started.notify_one();
                        release.notified().await;
                        Ok(222)
                    })
                    .await
                    .unwrap()
            })
        };

        started.notified().await;

        // A (5, 10) caller must not be handed the (0, 3) result while the
        // (5, 10) computation is in flight; it waits for that result.
        let waiter = {
            let cache = Arc::clone(&cache);
            let timeline = timeline.clone();
            tokio::spawn(async move {
                cache
                    .get_or_compute((timeline, 5, 10), || async { Ok(333) })
                    .await
                    .unwrap()
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        release.notify_one();

        assert_eq!(*slow.await.unwrap(), 222);
        assert_eq!(*waiter.await.unwrap(), 222);
    }

    #[tokio::test]
    async fn stale_served_for_same_query_on_older_timeline() {
        let cache: Arc<RecomputeCache<(Vec<i64>, i64, i64), i64>> = Arc::new(RecomputeCache::new());

        cache
            .get_or_compute((vec![1], 5, 10), || async { Ok(1) })
            .await
            .unwrap();

        let release = Arc::new(Notify::new());
        let started = Arc::new(Notify::new());

        let slow = {
            let cache = Arc::clone(&cache);
            let release = Arc::clone(&release);
            let started = Arc::clone(&started);
            tokio::spawn(async move {
                cache
                    .get_or_compute((vec![1, 2], 5, 10), move || async move {
                        started.notify_one();
                        release.notified().await;
                        Ok(2)
                    })
                    .await
                    .unwrap()
            })
        };

        started.notified().await;

        // Same (5, 10) query against the grown timeline: the older result
        // is an acceptable stale answer.
        let stale = cache
            .get_or_compute((vec![1, 2], 5, 10), || async { Ok(99) })
            .await
            .unwrap();
        assert_eq!(*stale, 1);

        release.notify_one();
        assert_eq!(*slow.await.unwrap(), 2);
    }

    #[tokio::test]
    async fn failure_surfaces_to_initiator_and_keeps_prior_result() {
        let cache: RecomputeCache<Vec<i64>, i64> = RecomputeCache::new();
        cache
            .get_or_compute(vec![1], || async { Ok(1) })
            .await
            .unwrap();

        let err = cache
            .get_or_compute(vec![1, 2], || async {
                Err(AppError::Computation("boom".to_string()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Computation(_)));

        // The prior result was not discarded by the failed recompute.
        let calls = AtomicUsize::new(0);
        let value = cache
            .get_or_compute(vec![1], || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(5)
            })
            .await
            .unwrap();
        assert_eq!(*value, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        // The failed key reverted to empty and can be recomputed.
        let value = cache
            .get_or_compute(vec![1, 2], || async { Ok(2) })
            .await
            .unwrap();
        assert_eq!(*value, 2);
    }

    #[tokio::test]
    async fn waiter_without_stale_sees_failure() {
        let cache: Arc<RecomputeCache<Vec<i64>, i64>> = Arc::new(RecomputeCache::new());

        let release = Arc::new(Notify::new());
        let started = Arc::new(Notify::new());

        let initiator = {
            let cache = Arc::clone(&cache);
            let release = Arc::clone(&release);
            let started = Arc::clone(&started);
            tokio::spawn(async move {
                cache
                    .get_or_compute(vec![1], move || async move {
                        started.notify_one();
                        release.notified().await;
                        Err(AppError::Computation("boom".to_string()))
                    })
                    .await
            })
        };

        started.notified().await;

        let waiter = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.get_or_compute(vec![1], || async { Ok(9) }).await })
        };

        // Give the waiter time to attach to the in-flight computation.
        tokio::time::sleep(Duration::from_millis(20)).await;
        release.notify_one();

        assert!(initiator.await.unwrap().is_err());
        assert!(waiter.await.unwrap().is_err());
    }
}
