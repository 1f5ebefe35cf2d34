//! Mutations and their declared invalidations.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use super::{QueryCache, QueryKey};
use crate::error::Result;

/// Type-erased cache operations a mutation may trigger.
///
/// Lets one executor invalidate caches holding different value types.
#[async_trait]
pub trait CacheControl: Send + Sync {
    /// Invalidate every key starting with `prefix` and wait for the
    /// refetches this starts.
    async fn invalidate_matching(&self, prefix: &QueryKey);

    /// Drop the cached state of `key`.
    fn remove(&self, key: &QueryKey);

    /// Drop every cached entry.
    fn clear(&self);
}

#[async_trait]
impl<V: Clone + Send + Sync + 'static> CacheControl for QueryCache<V> {
    async fn invalidate_matching(&self, prefix: &QueryKey) {
        QueryCache::invalidate_matching(self, prefix).await;
    }

    fn remove(&self, key: &QueryKey) {
        QueryCache::remove(self, key);
    }

    fn clear(&self) {
        QueryCache::clear(self);
    }
}

/// Cache effects of a mutation, applied only when it succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    name: String,
    removes: Vec<QueryKey>,
    invalidates: Vec<QueryKey>,
}

impl Mutation {
    /// Mutation with no cache effects.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            removes: Vec::new(),
            invalidates: Vec::new(),
        }
    }

    /// Invalidate every key under `prefix` on success.
    pub fn invalidates(mut self, prefix: QueryKey) -> Self {
        self.invalidates.push(prefix);
        self
    }

    /// Remove `key` on success, before invalidations run.
    pub fn removes(mut self, key: QueryKey) -> Self {
        self.removes.push(key);
        self
    }

    /// Name used in logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared invalidation prefixes.
    pub fn invalidated_keys(&self) -> &[QueryKey] {
        &self.invalidates
    }
}

/// Runs mutations and applies their cache effects.
#[derive(Clone, Default)]
pub struct MutationExecutor {
    caches: Vec<Arc<dyn CacheControl>>,
}

impl std::fmt::Debug for MutationExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationExecutor")
            .field("caches", &self.caches.len())
            .finish()
    }
}

impl MutationExecutor {
    /// Executor with no caches attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a cache whose keys this executor's mutations may touch.
    pub fn with_cache(mut self, cache: Arc<dyn CacheControl>) -> Self {
        self.caches.push(cache);
        self
    }

    /// Await `operation`; on success apply the effects of `mutation` and wait
    /// for the refetches they start. A failure leaves every cache untouched.
    pub async fn execute<T, Fut>(&self, mutation: &Mutation, operation: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        match operation.await {
            Ok(value) => {
                tracing::debug!(mutation = %mutation.name, "mutation succeeded");
                self.apply(mutation).await;
                Ok(value)
            },
            Err(e) => {
                tracing::debug!(mutation = %mutation.name, "mutation failed: {}", e);
                Err(e)
            },
        }
    }

    async fn apply(&self, mutation: &Mutation) {
        for key in &mutation.removes {
            for cache in &self.caches {
                cache.remove(key);
            }
        }

        let refetches = mutation.invalidates.iter().flat_map(|prefix| {
            self.caches
                .iter()
                .map(move |cache| cache.invalidate_matching(prefix))
        });
        futures::future::join_all(refetches).await;
    }

    /// Clear every attached cache.
    pub fn clear_all(&self) {
        for cache in &self.caches {
            cache.clear();
        }
    }
}
