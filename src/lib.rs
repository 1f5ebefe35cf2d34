//! Client-side data synchronization for a task-management REST service.
//!
//! `taskflow` authenticates a user, keeps a read-through cache of the
//! user's tasks and applies create, update and delete mutations against
//! the backend, invalidating the cache as it goes.
//!
//! # Overview
//!
//! Data flows view -> cache -> API client -> backend and back. A view
//! subscribes to a cache key; the cache fetches through the API client when
//! the key is missing or stale and notifies subscribers on every
//! transition. Mutations go straight to the API client and, on success,
//! invalidate the keys they declare, which triggers refetches.
//!
//! # Module Organization
//!
//! - [`types`] - Wire types of the REST contract (tasks, auth, session)
//! - [`client`] - API gateway client, HTTP middleware and transport
//! - [`session`] - Session store with durable persistence
//! - [`storage`] - Key-value persistence backends
//! - [`cache`] - Query cache and mutation executor
//! - [`tasks`] - Task queries and mutations over the cache
//! - [`view`] - Pure projections for display (filtering, stats, labels)
//! - [`notify`] - User-visible notifications
//! - [`app`] - Application context tying everything together
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use taskflow::{ClientConfig, Taskflow};
//! use taskflow::types::TaskRequest;
//!
//! # async fn run() -> taskflow::Result<()> {
//! let app = Taskflow::new(ClientConfig::from_env())?;
//! app.login("alice", "secret").await?;
//! app.tasks().create_task(&TaskRequest::new("Write release notes")).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod app;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod notify;
pub mod session;
pub mod storage;
pub mod tasks;
pub mod types;
pub mod view;

// Re-exports for ergonomic access
pub use app::Taskflow;
pub use cache::{CacheEntry, QueryCache, QueryKey, QueryStatus};
pub use client::{ApiClient, AuthApi, TaskApi};
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use session::{SessionPhase, SessionStore};
pub use tasks::TaskQueries;
