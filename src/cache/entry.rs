//! Per-key cache state.

use chrono::{DateTime, Utc};

use super::QueryKey;
use crate::error::Error;

/// Fetch state of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryStatus {
    /// Never fetched.
    Idle,
    /// A fetch is pending or about to start. Any previous value or error is
    /// still visible.
    Loading,
    /// Last fetch succeeded.
    Success,
    /// Last fetch failed. A value from an earlier success is kept.
    Error,
}

/// Snapshot of one cached query.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V> {
    /// Query identity.
    pub key: QueryKey,
    /// Fetch state.
    pub status: QueryStatus,
    /// Last successfully fetched value.
    pub value: Option<V>,
    /// Error of the last fetch, cleared on success.
    pub error: Option<Error>,
    /// Completion time of the last successful fetch.
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub(crate) invalidated: bool,
}

impl<V> CacheEntry<V> {
    pub(crate) fn idle(key: QueryKey) -> Self {
        Self {
            key,
            status: QueryStatus::Idle,
            value: None,
            error: None,
            last_fetched_at: None,
            invalidated: false,
        }
    }

    /// `true` while a fetch is pending.
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    /// `true` after a successful fetch.
    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    /// `true` after a failed fetch.
    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    /// `true` when the entry was invalidated and not refetched since.
    pub fn is_stale(&self) -> bool {
        self.invalidated
    }

    /// Serve the cached value without a fetch.
    pub(crate) fn is_fresh(&self) -> bool {
        self.status == QueryStatus::Success && !self.invalidated
    }

    pub(crate) fn succeed(&mut self, value: V) {
        self.status = QueryStatus::Success;
        self.value = Some(value);
        self.error = None;
        self.last_fetched_at = Some(Utc::now());
        self.invalidated = false;
    }

    pub(crate) fn fail(&mut self, error: Error) {
        self.status = QueryStatus::Error;
        self.error = Some(error);
        self.invalidated = false;
    }
}
