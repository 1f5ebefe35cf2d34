//! Query and mutation cache.
//!
//! [`QueryCache`] maps a [`QueryKey`] to the last known result of the query
//! behind it. Each key moves through `idle -> loading -> success | error`;
//! invalidation or refetch moves it back to `loading` while the previous
//! value and error stay visible.
//!
//! Guarantees:
//! - at most one fetch per key is in flight; concurrent callers share it
//! - an invalidation notifies subscribers before its refetch resolves
//! - when a newer fetch for a key starts, the result of an older one is
//!   discarded
//! - dropping every caller of a fetch does not abort it; its result still
//!   lands in the entry
//!
//! Fetches run on the tokio runtime, so cache operations must be called from
//! within one.

pub mod entry;
pub mod key;
pub mod mutation;

pub use entry::{CacheEntry, QueryStatus};
pub use key::QueryKey;
pub use mutation::{CacheControl, Mutation, MutationExecutor};

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;

use crate::error::Result;

type Fetcher<V> = Arc<dyn Fn() -> BoxFuture<'static, Result<V>> + Send + Sync>;
type Listener<V> = Arc<dyn Fn(&CacheEntry<V>) + Send + Sync>;
type Flight = Shared<BoxFuture<'static, ()>>;

/// How many times a failed fetch is retried. Retries are immediate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryPolicy {
    retries: u32,
}

impl RetryPolicy {
    /// Single attempt.
    pub const NONE: Self = Self { retries: 0 };

    /// Retry up to `retries` times after the first failure.
    pub const fn retries(retries: u32) -> Self {
        Self { retries }
    }

    /// Total attempts, including the first.
    pub fn attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }
}

/// A fetchable query: key, fetch function and retry policy.
pub struct Query<V> {
    key: QueryKey,
    fetcher: Fetcher<V>,
    retry: RetryPolicy,
    enabled: bool,
}

impl<V> Clone for Query<V> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            fetcher: self.fetcher.clone(),
            retry: self.retry,
            enabled: self.enabled,
        }
    }
}

impl<V> std::fmt::Debug for Query<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("key", &self.key)
            .field("retry", &self.retry)
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl<V: Send + 'static> Query<V> {
    /// Create an enabled query with no retries.
    pub fn new<F, Fut>(key: QueryKey, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        Self {
            key,
            fetcher: Arc::new(move || fetch().boxed()),
            retry: RetryPolicy::NONE,
            enabled: true,
        }
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Enable or disable the query. A disabled query never fetches.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Key of this query.
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Whether the query may fetch.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn run(&self) -> Result<V> {
        let attempts = self.retry.attempts();
        let mut attempt = 1;
        loop {
            match (self.fetcher)().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts => {
                    tracing::debug!(key = %self.key, attempt, "fetch failed, retrying: {}", e);
                    attempt += 1;
                },
                Err(e) => return Err(e),
            }
        }
    }
}

struct Slot<V> {
    entry: CacheEntry<V>,
    query: Option<Query<V>>,
    flight: Option<(u64, Flight)>,
    listeners: Vec<(u64, Listener<V>)>,
}

impl<V> Slot<V> {
    fn new(key: QueryKey) -> Self {
        Self {
            entry: CacheEntry::idle(key),
            query: None,
            flight: None,
            listeners: Vec::new(),
        }
    }
}

/// Listener calls collected under the slot lock and delivered after it is
/// released.
struct Notice<V> {
    entry: CacheEntry<V>,
    listeners: Vec<Listener<V>>,
}

impl<V> Notice<V> {
    fn deliver(self) {
        for listener in &self.listeners {
            listener(&self.entry);
        }
    }
}

struct Inner<V> {
    slots: DashMap<QueryKey, Slot<V>>,
    // Shared by fetch generations and subscription ids.
    next_id: AtomicU64,
}

/// Keyed store of query results.
///
/// Cheap to clone; clones share state.
///
/// # Examples
///
/// ```rust
/// use taskflow::cache::{Query, QueryCache, QueryKey, QueryStatus};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let cache: QueryCache<u32> = QueryCache::new();
/// let query = Query::new(QueryKey::new("answer"), || async { Ok(42) });
///
/// let entry = cache.fetch(&query).await;
/// assert_eq!(entry.status, QueryStatus::Success);
/// assert_eq!(entry.value, Some(42));
/// # }
/// ```
pub struct QueryCache<V> {
    inner: Arc<Inner<V>>,
}

impl<V> Clone for QueryCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<V> std::fmt::Debug for QueryCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("keys", &self.inner.slots.len())
            .finish()
    }
}

impl<V: Clone + Send + Sync + 'static> Default for QueryCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send + Sync + 'static> QueryCache<V> {
    /// Empty cache.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                slots: DashMap::new(),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    fn next_id(&self) -> u64 {
        self.inner.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn notice(slot: &Slot<V>) -> Notice<V> {
        Notice {
            entry: slot.entry.clone(),
            listeners: slot.listeners.iter().map(|(_, l)| l.clone()).collect(),
        }
    }

    /// Install a new flight for `slot`, superseding any previous one.
    ///
    /// The flight is not polled yet; the caller spawns it with [`drive`]
    /// once the slot lock is released.
    fn launch(&self, slot: &mut Slot<V>, query: Query<V>) -> Flight {
        let generation = self.next_id();
        let weak = Arc::downgrade(&self.inner);
        let key = query.key.clone();
        let flight = async move {
            let result = query.run().await;
            if let Some(inner) = weak.upgrade() {
                QueryCache { inner }.complete(&key, generation, result);
            }
        }
        .boxed()
        .shared();

        if slot.flight.is_some() {
            tracing::debug!(key = %slot.entry.key, generation, "superseding in-flight fetch");
        }
        slot.flight = Some((generation, flight.clone()));
        slot.entry.status = QueryStatus::Loading;
        flight
    }

    fn complete(&self, key: &QueryKey, generation: u64, result: Result<V>) {
        let notice = {
            let Some(mut slot) = self.inner.slots.get_mut(key) else {
                tracing::debug!(key = %key, "discarding result for removed key");
                return;
            };
            match &slot.flight {
                Some((current, _)) if *current == generation => {},
                _ => {
                    tracing::debug!(key = %key, generation, "discarding superseded result");
                    return;
                },
            }
            slot.flight = None;
            match result {
                Ok(value) => {
                    tracing::debug!(key = %key, "fetch succeeded");
                    slot.entry.succeed(value);
                },
                Err(e) => {
                    tracing::debug!(key = %key, "fetch failed: {}", e);
                    slot.entry.fail(e);
                },
            }
            Self::notice(&slot)
        };
        notice.deliver();
    }

    /// Read the entry for `query`, fetching when it is missing, stale or
    /// failed.
    ///
    /// A fresh success is returned without touching the network; an
    /// in-flight fetch is joined. A disabled query returns the entry as is.
    pub async fn fetch(&self, query: &Query<V>) -> CacheEntry<V> {
        let key = query.key.clone();
        let (flight, notice) = {
            let mut slot = self
                .inner
                .slots
                .entry(key.clone())
                .or_insert_with(|| Slot::new(key.clone()));
            if !query.enabled {
                return slot.entry.clone();
            }
            slot.query = Some(query.clone());
            if slot.entry.is_fresh() {
                return slot.entry.clone();
            }
            match &slot.flight {
                Some((_, flight)) => (flight.clone(), None),
                None => {
                    let was_loading = slot.entry.is_loading();
                    let flight = self.launch(&mut slot, query.clone());
                    let notice = (!was_loading).then(|| Self::notice(&slot));
                    (flight, notice)
                },
            }
        };

        if let Some(notice) = notice {
            notice.deliver();
        }
        drive(&flight);
        flight.await;
        self.entry(&key).unwrap_or_else(|| CacheEntry::idle(key))
    }

    /// Like [`fetch`](Self::fetch) but ignores freshness.
    pub async fn refetch(&self, query: &Query<V>) -> CacheEntry<V> {
        if let Some(mut slot) = self.inner.slots.get_mut(&query.key) {
            slot.entry.invalidated = true;
        }
        self.fetch(query).await
    }

    fn mark_stale(&self, key: &QueryKey) -> Option<Flight> {
        let (flight, notice) = {
            let mut slot = self.inner.slots.get_mut(key)?;
            slot.entry.invalidated = true;
            // Nothing to refetch: an idle or reset key stays idle.
            if slot.query.is_none() || slot.entry.status == QueryStatus::Idle {
                tracing::debug!(key = %key, "invalidated idle key");
                return None;
            }
            slot.entry.status = QueryStatus::Loading;
            let flight = match slot.query.clone() {
                Some(query) if !slot.listeners.is_empty() => Some(self.launch(&mut slot, query)),
                _ => None,
            };
            (flight, Self::notice(&slot))
        };

        tracing::debug!(key = %key, refetch = flight.is_some(), "invalidated");
        notice.deliver();
        if let Some(flight) = &flight {
            drive(flight);
        }
        flight
    }

    /// Mark `key` stale and set it loading.
    ///
    /// Keys that were never fetched, or were reset by
    /// [`remove`](Self::remove), are only marked stale and stay idle.
    /// Subscribers are notified first. If the key has subscribers and a
    /// known query, a refetch starts and this call waits for it; otherwise
    /// the next [`fetch`](Self::fetch) performs it.
    pub async fn invalidate(&self, key: &QueryKey) {
        if let Some(flight) = self.mark_stale(key) {
            flight.await;
        }
    }

    /// [`invalidate`](Self::invalidate) every key starting with `prefix`.
    pub async fn invalidate_matching(&self, prefix: &QueryKey) {
        let keys = self.keys_matching(prefix);
        let flights: Vec<Flight> = keys.iter().filter_map(|key| self.mark_stale(key)).collect();
        futures::future::join_all(flights).await;
    }

    fn keys_matching(&self, prefix: &QueryKey) -> Vec<QueryKey> {
        self.inner
            .slots
            .iter()
            .filter(|slot| slot.key().starts_with(prefix))
            .map(|slot| slot.key().clone())
            .collect()
    }

    /// Drop the cached state of `key`.
    ///
    /// An in-flight fetch for it is discarded. Subscribers stay registered
    /// and see an idle entry.
    pub fn remove(&self, key: &QueryKey) {
        if self
            .inner
            .slots
            .remove_if(key, |_, slot| slot.listeners.is_empty())
            .is_some()
        {
            tracing::debug!(key = %key, "removed");
            return;
        }

        let notice = {
            let Some(mut slot) = self.inner.slots.get_mut(key) else {
                return;
            };
            slot.flight = None;
            slot.query = None;
            slot.entry = CacheEntry::idle(key.clone());
            Self::notice(&slot)
        };
        tracing::debug!(key = %key, "reset");
        notice.deliver();
    }

    /// [`remove`](Self::remove) every key.
    pub fn clear(&self) {
        for key in self.keys() {
            self.remove(&key);
        }
    }

    /// Snapshot of the entry for `key`.
    pub fn entry(&self, key: &QueryKey) -> Option<CacheEntry<V>> {
        self.inner.slots.get(key).map(|slot| slot.entry.clone())
    }

    /// Every key currently held.
    pub fn keys(&self) -> Vec<QueryKey> {
        self.inner
            .slots
            .iter()
            .map(|slot| slot.key().clone())
            .collect()
    }

    /// Call `listener` with a snapshot on every transition of `key`.
    ///
    /// The listener runs on whichever task caused the transition and must
    /// not block. Dropping the returned [`Subscription`] unsubscribes.
    pub fn subscribe<F>(&self, key: &QueryKey, listener: F) -> Subscription
    where
        F: Fn(&CacheEntry<V>) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.inner
            .slots
            .entry(key.clone())
            .or_insert_with(|| Slot::new(key.clone()))
            .listeners
            .push((id, Arc::new(listener)));

        let weak = Arc::downgrade(&self.inner);
        let key = key.clone();
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    if let Some(mut slot) = inner.slots.get_mut(&key) {
                        slot.listeners.retain(|(lid, _)| *lid != id);
                    }
                }
            })),
        }
    }

    /// Number of live subscriptions on `key`.
    pub fn subscriber_count(&self, key: &QueryKey) -> usize {
        self.inner
            .slots
            .get(key)
            .map_or(0, |slot| slot.listeners.len())
    }
}

/// Run `flight` to completion even if every caller stops awaiting it.
fn drive(flight: &Flight) {
    tokio::spawn(flight.clone());
}

/// Handle returned by [`QueryCache::subscribe`]. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Unsubscribe now.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
