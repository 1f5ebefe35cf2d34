//! Task queries and mutations.
//!
//! [`TaskQueries`] wires the task endpoints into the query cache:
//!
//! | Operation     | Cache key      | Retry | On success                          |
//! |---------------|----------------|-------|-------------------------------------|
//! | `tasks_list`  | `tasks`        | 1     |                                     |
//! | `task(id)`    | `tasks/<id>`   | 0     |                                     |
//! | `create_task` |                | 0     | invalidate `tasks*`                 |
//! | `update_task` |                | 0     | invalidate `tasks*`                 |
//! | `delete_task` |                | 0     | remove `tasks/<id>`, invalidate `tasks*` |
//!
//! Every mutation publishes a [`Notification`](crate::notify::Notification)
//! with its outcome.

use std::sync::Arc;

use crate::cache::{
    CacheEntry, Mutation, MutationExecutor, Query, QueryCache, QueryKey, RetryPolicy,
    Subscription,
};
use crate::client::TaskApi;
use crate::error::Result;
use crate::notify::{Notification, Notifier};
use crate::types::{DeleteResponse, Task, TaskRequest};

/// Resource name of every task key.
pub const TASKS_RESOURCE: &str = "tasks";

/// Retry policy of the task list query.
pub const LIST_RETRY: RetryPolicy = RetryPolicy::retries(1);

/// Key of the task list.
pub fn tasks_key() -> QueryKey {
    QueryKey::new(TASKS_RESOURCE)
}

/// Key of a single task.
pub fn task_key(id: i64) -> QueryKey {
    tasks_key().with_param(id)
}

/// Task list and detail caches plus the mutations that invalidate them.
///
/// Cheap to clone; clones share caches and notifier.
#[derive(Clone)]
pub struct TaskQueries {
    api: Arc<dyn TaskApi>,
    lists: QueryCache<Vec<Task>>,
    details: QueryCache<Task>,
    mutations: MutationExecutor,
    notifier: Notifier,
}

impl std::fmt::Debug for TaskQueries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQueries")
            .field("lists", &self.lists)
            .field("details", &self.details)
            .finish()
    }
}

impl TaskQueries {
    /// Queries over `api` with a fresh notifier.
    pub fn new(api: Arc<dyn TaskApi>) -> Self {
        Self::with_notifier(api, Notifier::default())
    }

    /// Queries over `api` reporting to `notifier`.
    pub fn with_notifier(api: Arc<dyn TaskApi>, notifier: Notifier) -> Self {
        let lists = QueryCache::new();
        let details = QueryCache::new();
        let mutations = MutationExecutor::new()
            .with_cache(Arc::new(lists.clone()))
            .with_cache(Arc::new(details.clone()));
        Self {
            api,
            lists,
            details,
            mutations,
            notifier,
        }
    }

    /// The task list query.
    pub fn list_query(&self) -> Query<Vec<Task>> {
        let api = self.api.clone();
        Query::new(tasks_key(), move || {
            let api = api.clone();
            async move { api.tasks_list().await }
        })
        .with_retry(LIST_RETRY)
    }

    /// The detail query for `id`. Disabled for id `0`.
    pub fn task_query(&self, id: i64) -> Query<Task> {
        let api = self.api.clone();
        Query::new(task_key(id), move || {
            let api = api.clone();
            async move { api.task_get(id).await }
        })
        .enabled(id != 0)
    }

    /// Read the task list through the cache.
    pub async fn tasks_list(&self) -> CacheEntry<Vec<Task>> {
        self.lists.fetch(&self.list_query()).await
    }

    /// Read one task through the cache.
    pub async fn task(&self, id: i64) -> CacheEntry<Task> {
        self.details.fetch(&self.task_query(id)).await
    }

    /// Refetch the task list regardless of freshness.
    pub async fn refresh_list(&self) -> CacheEntry<Vec<Task>> {
        self.lists.refetch(&self.list_query()).await
    }

    /// Observe the task list entry.
    pub fn subscribe_list<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&CacheEntry<Vec<Task>>) + Send + Sync + 'static,
    {
        self.lists.subscribe(&tasks_key(), listener)
    }

    /// Observe the entry of task `id`.
    pub fn subscribe_task<F>(&self, id: i64, listener: F) -> Subscription
    where
        F: Fn(&CacheEntry<Task>) + Send + Sync + 'static,
    {
        self.details.subscribe(&task_key(id), listener)
    }

    /// Create a task.
    pub async fn create_task(&self, request: &TaskRequest) -> Result<Task> {
        let mutation = Mutation::new("create_task").invalidates(tasks_key());
        let result = self
            .mutations
            .execute(&mutation, self.api.task_create(request))
            .await;
        self.report(&result, "Task created successfully", "Failed to create task");
        result
    }

    /// Replace the mutable fields of task `id`.
    pub async fn update_task(&self, id: i64, request: &TaskRequest) -> Result<Task> {
        let mutation = Mutation::new("update_task").invalidates(tasks_key());
        let result = self
            .mutations
            .execute(&mutation, self.api.task_update(id, request))
            .await;
        self.report(&result, "Task updated successfully", "Failed to update task");
        result
    }

    /// Delete task `id`.
    pub async fn delete_task(&self, id: i64) -> Result<Option<DeleteResponse>> {
        let mutation = Mutation::new("delete_task")
            .removes(task_key(id))
            .invalidates(tasks_key());
        let result = self
            .mutations
            .execute(&mutation, self.api.task_delete(id))
            .await;
        self.report(&result, "Task deleted successfully", "Failed to delete task");
        result
    }

    fn report<T>(&self, result: &Result<T>, success: &str, fallback: &str) {
        match result {
            Ok(_) => self.notifier.success(success),
            Err(e) => self.notifier.error(e.user_message(fallback)),
        }
    }

    /// Drop every cached task, e.g. on logout.
    pub fn clear(&self) {
        self.mutations.clear_all();
    }

    /// Receive mutation outcome notifications.
    pub fn notifications(&self) -> tokio::sync::broadcast::Receiver<Notification> {
        self.notifier.subscribe()
    }

    /// The list cache.
    pub fn lists(&self) -> &QueryCache<Vec<Task>> {
        &self.lists
    }

    /// The detail cache.
    pub fn details(&self) -> &QueryCache<Task> {
        &self.details
    }
}
