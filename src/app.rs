//! Application context.
//!
//! [`Taskflow`] wires configuration, durable storage, the session store, the
//! API client and the task caches together. Build one per process; every
//! accessor hands out cheap clones of shared state.

use std::sync::Arc;

use crate::client::ApiClient;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::session::{SessionPhase, SessionStore};
use crate::storage::{FileStore, KeyValueStore, MemoryStore};
use crate::tasks::TaskQueries;
use crate::types::{LoginRequest, RegisterRequest, Session};

/// Everything a front end needs to talk to the task service.
///
/// # Examples
///
/// ```rust,no_run
/// use taskflow::{ClientConfig, Taskflow};
///
/// # async fn run() -> taskflow::Result<()> {
/// let app = Taskflow::new(ClientConfig::from_env())?;
/// if !app.is_authenticated() {
///     app.login("alice", "secret").await?;
/// }
/// let tasks = app.tasks().tasks_list().await;
/// println!("{:?}", tasks.status);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Taskflow {
    config: ClientConfig,
    session: SessionStore,
    api: ApiClient,
    tasks: TaskQueries,
}

impl Taskflow {
    /// Build the context with file-backed session storage.
    ///
    /// Uses `config.storage_dir`, else `<home>/.taskflow`; without a home
    /// directory the session lives in memory only.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let dir = config
            .storage_dir
            .clone()
            .or_else(ClientConfig::default_storage_dir);
        let storage: Arc<dyn KeyValueStore> = match dir {
            Some(dir) => Arc::new(FileStore::new(dir)),
            None => {
                tracing::warn!("no home directory found; the session will not persist");
                Arc::new(MemoryStore::new())
            },
        };
        Self::with_storage(config, storage)
    }

    /// Build the context over an explicit store and restore the session
    /// it holds.
    pub fn with_storage(config: ClientConfig, storage: Arc<dyn KeyValueStore>) -> Result<Self> {
        config.validate()?;
        let session = SessionStore::new(storage);
        session.restore();
        let api = ApiClient::new(&config, Arc::new(session.clone()))?;
        let tasks = TaskQueries::new(Arc::new(api.clone()));
        tracing::debug!(base_url = %api.base_url(), phase = ?session.phase(), "taskflow ready");
        Ok(Self {
            config,
            session,
            api,
            tasks,
        })
    }

    /// Sign in.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session> {
        self.session
            .login(&self.api, &LoginRequest::new(username, password))
            .await
    }

    /// Create an account and sign in as it.
    pub async fn register(&self, request: &RegisterRequest) -> Result<Session> {
        self.session.register(&self.api, request).await
    }

    /// Sign out and drop every cached task. Idempotent.
    pub fn logout(&self) -> Result<()> {
        self.tasks.clear();
        self.session.logout()
    }

    /// `true` while signed in.
    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// The signed-in user.
    pub fn current_user(&self) -> Option<Session> {
        self.session.current()
    }

    /// Session lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        self.session.phase()
    }

    /// The session store.
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// The API client.
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Task queries and mutations.
    pub fn tasks(&self) -> &TaskQueries {
        &self.tasks
    }

    /// The configuration in use.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{SESSION_KEY, TOKEN_KEY};

    #[test]
    fn restores_persisted_session_on_build() {
        let storage = Arc::new(MemoryStore::new());
        let session = r#"{"token":"abc","type":"Bearer","id":1,"username":"alice","fullName":"Alice","email":"a@x"}"#;
        storage.set(SESSION_KEY, session).unwrap();
        storage.set(TOKEN_KEY, "abc").unwrap();

        let app = Taskflow::with_storage(ClientConfig::default(), storage.clone()).unwrap();
        assert!(app.is_authenticated());
        assert_eq!(app.phase(), SessionPhase::Active);
        assert_eq!(app.current_user().unwrap().username, "alice");

        app.logout().unwrap();
        assert!(!app.is_authenticated());
        assert!(storage.is_empty());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let err = Taskflow::with_storage(
            ClientConfig::new("::not a url::"),
            Arc::new(MemoryStore::new()),
        )
        .unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }
}
