//! Cache, throttle and single-flight gate in front of a network call.
//!
//! Order of checks for a key:
//! 1. a fresh cached value is returned as-is (no throttle slot used)
//! 2. a request already in flight for the key is joined
//! 3. a dispatch inside the throttle window fails with the caller's
//!    "throttled" error
//! 4. otherwise the dispatch time is recorded and the fetch runs
//!
//! Stale cache entries are never evicted, only ignored.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;

use crate::clock::Clock;

/// Error types that can express "rejected by the throttle".
pub trait ThrottledError {
    fn throttled() -> Self;
}

/// How throttle windows are keyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleScope {
    /// One window per cache key.
    PerKey,
    /// One window shared by every key of the gate.
    Shared,
}

#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Cache lifetime; `None` keeps values for the lifetime of the gate.
    pub ttl: Option<Duration>,
    /// Minimum time between two dispatches in the same throttle window.
    pub throttle: Duration,
    pub scope: ThrottleScope,
}

impl GateConfig {
    pub fn new(ttl: Option<Duration>, throttle: Duration, scope: ThrottleScope) -> Self {
        Self {
            ttl,
            throttle,
            scope,
        }
    }
}

/// A cached value with the time it was stored.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub fetched_at: DateTime<Utc>,
    pub value: T,
}

impl<T> CacheEntry<T> {
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Option<Duration>) -> bool {
        match ttl {
            None => true,
            Some(ttl) => elapsed(self.fetched_at, now) < ttl,
        }
    }
}

type InFlight<T, E> = Shared<BoxFuture<'static, Result<T, E>>>;

struct GateState<T, E> {
    cache: HashMap<String, CacheEntry<T>>,
    last_dispatch: HashMap<String, DateTime<Utc>>,
    in_flight: HashMap<String, InFlight<T, E>>,
}

enum Admission<T, E> {
    Cached(T),
    Join(InFlight<T, E>),
    Dispatch(InFlight<T, E>),
    Throttled,
}

/// Request gate for values of type `T` failing with `E`.
pub struct RequestGate<T, E> {
    name: &'static str,
    config: GateConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<GateState<T, E>>,
}

impl<T, E> RequestGate<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: ThrottledError + Clone + Send + Sync + 'static,
{
    pub fn new(name: &'static str, config: GateConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            name,
            config,
            clock,
            state: Mutex::new(GateState {
                cache: HashMap::new(),
                last_dispatch: HashMap::new(),
                in_flight: HashMap::new(),
            }),
        }
    }

    /// Resolve `key`, calling `fetch` only when the cache misses, nothing is
    /// in flight, and the throttle window allows a dispatch.
    pub async fn run<F, Fut>(&self, key: &str, fetch: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let shared = match self.admit(key, fetch) {
            Admission::Cached(value) => {
                tracing::debug!(gate = self.name, key, "Cache hit");
                return Ok(value);
            }
            Admission::Throttled => {
                tracing::debug!(gate = self.name, key, "Request throttled");
                return Err(E::throttled());
            }
            Admission::Join(shared) => {
                tracing::debug!(gate = self.name, key, "Joining in-flight request");
                shared
            }
            Admission::Dispatch(shared) => shared,
        };

        let result = shared.clone().await;
        self.settle(key, &shared, &result);
        result
    }

    /// Cached value for `key` if it is still fresh.
    pub fn cached(&self, key: &str) -> Option<T> {
        let now = self.clock.now();
        let state = self.state.lock();
        state
            .cache
            .get(key)
            .filter(|entry| entry.is_fresh(now, self.config.ttl))
            .map(|entry| entry.value.clone())
    }

    fn admit<F, Fut>(&self, key: &str, fetch: F) -> Admission<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let now = self.clock.now();
        let mut state = self.state.lock();

        if let Some(entry) = state.cache.get(key) {
            if entry.is_fresh(now, self.config.ttl) {
                return Admission::Cached(entry.value.clone());
            }
        }

        if let Some(shared) = state.in_flight.get(key) {
            return Admission::Join(shared.clone());
        }

        let throttle_key = match self.config.scope {
            ThrottleScope::PerKey => key,
            ThrottleScope::Shared => "",
        };
        if let Some(last) = state.last_dispatch.get(throttle_key) {
            if elapsed(*last, now) < self.config.throttle {
                return Admission::Throttled;
            }
        }
        state.last_dispatch.insert(throttle_key.to_string(), now);

        tracing::debug!(gate = self.name, key, "Dispatching request");
        let shared = fetch().boxed().shared();
        state.in_flight.insert(key.to_string(), shared.clone());
        Admission::Dispatch(shared)
    }

    /// First awaiter to finish clears the in-flight slot and caches success.
    fn settle(&self, key: &str, shared: &InFlight<T, E>, result: &Result<T, E>) {
        let mut state = self.state.lock();
        let ours = state
            .in_flight
            .get(key)
            .is_some_and(|current| current.ptr_eq(shared));
        if !ours {
            return;
        }
        state.in_flight.remove(key);
        if let Ok(value) = result {
            let fetched_at = self.clock.now();
            state.cache.insert(
                key.to_string(),
                CacheEntry {
                    fetched_at,
                    value: value.clone(),
                },
            );
        }
    }
}

/// Elapsed time from `then` to `now`; a clock that moved backwards counts as zero.
fn elapsed(then: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - then).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq)]
    enum TestError {
        Throttled,
        Failed,
    }

    impl ThrottledError for TestError {
        fn throttled() -> Self {
            TestError::Throttled
        }
    }

    fn gate(
        ttl: Option<Duration>,
        scope: ThrottleScope,
    ) -> (RequestGate<String, TestError>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let config = GateConfig::new(ttl, Duration::from_secs(2), scope);
        (RequestGate::new("test", config, clock.clone()), clock)
    }

    fn counting_fetch(
        calls: &Arc<AtomicUsize>,
        value: &str,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<String, TestError>> {
        let calls = calls.clone();
        let value = value.to_string();
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok(value) }.boxed()
        }
    }

    #[tokio::test]
    async fn test_cache_hit_skips_fetch() {
        let (gate, clock) = gate(Some(Duration::from_secs(600)), ThrottleScope::PerKey);
        let calls = Arc::new(AtomicUsize::new(0));

        let first = gate.run("k", counting_fetch(&calls, "v1")).await.unwrap();
        clock.advance_secs(30);
        let second = gate.run("k", counting_fetch(&calls, "v2")).await.unwrap();

        assert_eq!(first, "v1");
        assert_eq!(second, "v1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cache_hit_does_not_consume_throttle() {
        let clock = Arc::new(ManualClock::default());
        let config = GateConfig::new(
            Some(Duration::from_secs(3)),
            Duration::from_secs(2),
            ThrottleScope::PerKey,
        );
        let gate: RequestGate<String, TestError> = RequestGate::new("test", config, clock.clone());
        let calls = Arc::new(AtomicUsize::new(0));

        gate.run("k", counting_fetch(&calls, "v")).await.unwrap();
        clock.advance(chrono::Duration::milliseconds(2500));
        gate.run("k", counting_fetch(&calls, "v")).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Stale at t+3; a window opened by the hit at t+2.5 would throttle this.
        clock.advance(chrono::Duration::milliseconds(500));
        assert!(gate.run("k", counting_fetch(&calls, "v")).await.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_second_dispatch_within_window_is_throttled() {
        let (gate, clock) = gate(Some(Duration::from_secs(600)), ThrottleScope::PerKey);
        let calls = Arc::new(AtomicUsize::new(0));

        let failing = || async { Err::<String, _>(TestError::Failed) };
        assert_eq!(gate.run("k", failing).await, Err(TestError::Failed));

        clock.advance_secs(1);
        let result = gate.run("k", counting_fetch(&calls, "v")).await;
        assert_eq!(result, Err(TestError::Throttled));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        clock.advance_secs(1);
        assert_eq!(gate.run("k", counting_fetch(&calls, "v")).await.unwrap(), "v");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_entry_refetches() {
        let (gate, clock) = gate(Some(Duration::from_secs(600)), ThrottleScope::PerKey);
        let calls = Arc::new(AtomicUsize::new(0));

        gate.run("k", counting_fetch(&calls, "old")).await.unwrap();
        clock.advance_secs(600);
        let value = gate.run("k", counting_fetch(&calls, "new")).await.unwrap();

        assert_eq!(value, "new");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_keys_are_throttled_independently() {
        let (gate, _clock) = gate(Some(Duration::from_secs(600)), ThrottleScope::PerKey);
        let calls = Arc::new(AtomicUsize::new(0));

        gate.run("a", counting_fetch(&calls, "a")).await.unwrap();
        gate.run("b", counting_fetch(&calls, "b")).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_shared_scope_throttles_across_keys() {
        let (gate, _clock) = gate(None, ThrottleScope::Shared);
        let calls = Arc::new(AtomicUsize::new(0));

        gate.run("a", counting_fetch(&calls, "a")).await.unwrap();
        let result = gate.run("b", counting_fetch(&calls, "b")).await;

        assert_eq!(result, Err(TestError::Throttled));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unbounded_ttl_never_expires() {
        let (gate, clock) = gate(None, ThrottleScope::Shared);
        let calls = Arc::new(AtomicUsize::new(0));

        gate.run("k", counting_fetch(&calls, "v")).await.unwrap();
        clock.advance_secs(60 * 60 * 24 * 30);
        assert_eq!(gate.cached("k").as_deref(), Some("v"));
        gate.run("k", counting_fetch(&calls, "v2")).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let (gate, clock) = gate(Some(Duration::from_secs(600)), ThrottleScope::PerKey);

        let failing = || async { Err::<String, _>(TestError::Failed) };
        assert!(gate.run("k", failing).await.is_err());
        assert!(gate.cached("k").is_none());

        clock.advance_secs(2);
        let ok = || async { Ok::<_, TestError>("v".to_string()) };
        assert_eq!(gate.run("k", ok).await.unwrap(), "v");
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_dispatch() {
        let (gate, _clock) = gate(Some(Duration::from_secs(600)), ThrottleScope::PerKey);
        let calls = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let slow_calls = calls.clone();
        let slow = move || {
            slow_calls.fetch_add(1, Ordering::SeqCst);
            async move {
                let _ = rx.await;
                Ok::<_, TestError>("shared".to_string())
            }
        };

        let first = gate.run("k", slow);
        let second = gate.run("k", counting_fetch(&calls, "other"));
        let release = async {
            tokio::task::yield_now().await;
            let _ = tx.send(());
        };

        let (a, b, ()) = tokio::join!(first, second, release);
        assert_eq!(a.unwrap(), "shared");
        assert_eq!(b.unwrap(), "shared");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_abandoned_dispatcher_does_not_cancel_shared_request() {
        let (gate, _clock) = gate(Some(Duration::from_secs(600)), ThrottleScope::PerKey);
        let calls = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let slow_calls = calls.clone();
        let slow = move || {
            slow_calls.fetch_add(1, Ordering::SeqCst);
            async move {
                let _ = rx.await;
                Ok::<_, TestError>("shared".to_string())
            }
        };

        let mut first = Box::pin(gate.run("k", slow));
        assert!(futures::poll!(first.as_mut()).is_pending());
        drop(first);

        tx.send(()).unwrap();
        let joined = gate.run("k", counting_fetch(&calls, "other")).await;

        assert_eq!(joined.unwrap(), "shared");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(gate.cached("k").as_deref(), Some("shared"));
    }
}
