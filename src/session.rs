//! Session store.
//!
//! [`SessionStore`] owns the authenticated identity for the whole process.
//! It is cheap to clone; every clone shares the same state, durable storage
//! and watch channel, so the API client's bearer middleware and the view
//! layer always agree on who is signed in.
//!
//! Persisted layout: the [`SESSION_KEY`] entry holds the session JSON and
//! the [`TOKEN_KEY`] entry the raw bearer token. Both are written together
//! and cleared together; a restore that finds only one of them treats the
//! state as corrupt and clears it.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;

use crate::client::auth_middleware::TokenSource;
use crate::client::AuthApi;
use crate::error::{Error, Result};
use crate::storage::{KeyValueStore, MemoryStore, SESSION_KEY, TOKEN_KEY};
use crate::types::{AuthResponse, LoginRequest, RegisterRequest, Session};

/// Lifecycle of the session store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Durable state not read yet.
    Restoring,
    /// A session is present.
    Active,
    /// No session (never signed in, logged out, or restore found nothing usable).
    Cleared,
}

struct Inner {
    storage: Arc<dyn KeyValueStore>,
    phase: RwLock<SessionPhase>,
    sender: watch::Sender<Option<Session>>,
    // Serializes persist-then-publish so observers never see a torn update.
    write_lock: Mutex<()>,
}

/// Process-wide holder of the authenticated [`Session`].
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("phase", &self.phase())
            .field("session", &*self.inner.sender.borrow())
            .finish()
    }
}

impl SessionStore {
    /// Create a store over `storage`. Call [`restore`](Self::restore) before use.
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                storage,
                phase: RwLock::new(SessionPhase::Restoring),
                sender,
                write_lock: Mutex::new(()),
            }),
        }
    }

    /// Store that forgets everything at process exit.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        *self.inner.phase.read()
    }

    /// Authenticate against the backend and establish the session.
    ///
    /// Fails with [`Error::Auth`] when the backend rejects the credentials;
    /// the previous session, if any, is left untouched.
    pub async fn login(&self, api: &dyn AuthApi, request: &LoginRequest) -> Result<Session> {
        let response = api.auth_login(request).await?;
        let session = self.accept(response)?;
        tracing::info!(username = %session.username, "signed in");
        Ok(session)
    }

    /// Create a backend account and sign in as it.
    pub async fn register(
        &self,
        api: &dyn AuthApi,
        request: &RegisterRequest,
    ) -> Result<Session> {
        let response = api.auth_register(request).await?;
        let session = self.accept(response)?;
        tracing::info!(username = %session.username, "registered and signed in");
        Ok(session)
    }

    fn accept(&self, response: AuthResponse) -> Result<Session> {
        let session = Session::from_auth(response)
            .ok_or_else(|| Error::parse("auth response carried an empty token"))?;
        self.establish(session.clone())?;
        Ok(session)
    }

    /// Persist `session` and make it current.
    ///
    /// Storage is written first; if that fails the in-memory state is not
    /// changed.
    pub fn establish(&self, session: Session) -> Result<()> {
        if !session.is_valid() {
            return Err(Error::parse("session token is empty"));
        }
        let json = serde_json::to_string(&session)?;

        let _guard = self.inner.write_lock.lock();
        self.inner
            .storage
            .set_many(&[(SESSION_KEY, json.as_str()), (TOKEN_KEY, session.token.as_str())])?;
        *self.inner.phase.write() = SessionPhase::Active;
        self.inner.sender.send_replace(Some(session));
        Ok(())
    }

    /// Forget the session in memory and in durable storage.
    ///
    /// Idempotent. The in-memory session is cleared even when removing the
    /// durable entries fails; the storage error is still returned.
    pub fn logout(&self) -> Result<()> {
        let _guard = self.inner.write_lock.lock();
        let previous = self.inner.sender.send_replace(None);
        *self.inner.phase.write() = SessionPhase::Cleared;
        if let Some(previous) = previous {
            tracing::info!(username = %previous.username, "signed out");
        }
        self.inner.storage.remove_many(&[SESSION_KEY, TOKEN_KEY])
    }

    /// Load the persisted session, if any.
    ///
    /// Never fails: unreadable or corrupt state degrades to "signed out"
    /// and corrupt entries are removed.
    pub fn restore(&self) -> Option<Session> {
        let _guard = self.inner.write_lock.lock();
        let restored = self.read_persisted();
        *self.inner.phase.write() = if restored.is_some() {
            SessionPhase::Active
        } else {
            SessionPhase::Cleared
        };
        self.inner.sender.send_replace(restored.clone());
        restored
    }

    fn read_persisted(&self) -> Option<Session> {
        let storage = &self.inner.storage;
        let (raw_session, raw_token) = match (storage.get(SESSION_KEY), storage.get(TOKEN_KEY)) {
            (Ok(session), Ok(token)) => (session, token),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!("could not read persisted session: {}", e);
                return None;
            },
        };

        let (raw_session, raw_token) = match (raw_session, raw_token) {
            (None, None) => return None,
            (Some(session), Some(token)) => (session, token),
            _ => {
                tracing::warn!("persisted session is incomplete; clearing it");
                self.clear_persisted();
                return None;
            },
        };

        match serde_json::from_str::<Session>(&raw_session) {
            Ok(session) if session.is_valid() && session.token == raw_token => {
                tracing::debug!(username = %session.username, "restored session");
                Some(session)
            },
            Ok(_) => {
                tracing::warn!("persisted session does not match its token; clearing it");
                self.clear_persisted();
                None
            },
            Err(e) => {
                tracing::warn!("persisted session is corrupt ({}); clearing it", e);
                self.clear_persisted();
                None
            },
        }
    }

    fn clear_persisted(&self) {
        if let Err(e) = self.inner.storage.remove_many(&[SESSION_KEY, TOKEN_KEY]) {
            tracing::warn!("could not clear persisted session: {}", e);
        }
    }

    /// The current session.
    pub fn current(&self) -> Option<Session> {
        self.inner.sender.borrow().clone()
    }

    /// The current bearer token.
    pub fn token(&self) -> Option<String> {
        self.inner
            .sender
            .borrow()
            .as_ref()
            .map(|session| session.token.clone())
    }

    /// `true` while a session is present.
    pub fn is_authenticated(&self) -> bool {
        self.inner.sender.borrow().is_some()
    }

    /// Observe session changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.inner.sender.subscribe()
    }
}

impl TokenSource for SessionStore {
    fn authorization(&self) -> Option<String> {
        self.inner
            .sender
            .borrow()
            .as_ref()
            .map(Session::authorization)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    struct FakeAuth {
        token: &'static str,
        reject: bool,
    }

    impl FakeAuth {
        fn response(&self, username: &str) -> Result<AuthResponse> {
            if self.reject {
                return Err(Error::auth(401, "Bad credentials"));
            }
            Ok(AuthResponse {
                token: self.token.to_string(),
                token_type: "Bearer".to_string(),
                id: 1,
                username: username.to_string(),
                email: format!("{}@example.com", username),
                full_name: "Alice Doe".to_string(),
            })
        }
    }

    #[async_trait]
    impl AuthApi for FakeAuth {
        async fn auth_login(&self, request: &LoginRequest) -> Result<AuthResponse> {
            self.response(&request.username)
        }

        async fn auth_register(&self, request: &RegisterRequest) -> Result<AuthResponse> {
            self.response(&request.username)
        }
    }

    fn store() -> (SessionStore, Arc<MemoryStore>) {
        let storage = Arc::new(MemoryStore::new());
        (SessionStore::new(storage.clone()), storage)
    }

    #[test]
    fn token_source_always_uses_bearer_scheme() {
        let (sessions, _) = store();
        let mut response = FakeAuth {
            token: "abc",
            reject: false,
        }
        .response("alice")
        .unwrap();
        response.token_type = "JWT".to_string();

        sessions
            .establish(Session::from_auth(response).unwrap())
            .unwrap();

        assert_eq!(
            TokenSource::authorization(&sessions).as_deref(),
            Some("Bearer abc")
        );
    }

    #[tokio::test]
    async fn login_persists_and_publishes() {
        let (sessions, storage) = store();
        let mut watcher = sessions.subscribe();
        let api = FakeAuth {
            token: "abc",
            reject: false,
        };

        let session = sessions
            .login(&api, &LoginRequest::new("alice", "secret"))
            .await
            .unwrap();

        assert_eq!(session.username, "alice");
        assert!(sessions.is_authenticated());
        assert_eq!(sessions.phase(), SessionPhase::Active);
        assert_eq!(sessions.token().as_deref(), Some("abc"));
        assert_eq!(sessions.authorization().as_deref(), Some("Bearer abc"));
        assert_eq!(storage.get(TOKEN_KEY).unwrap().as_deref(), Some("abc"));
        assert!(watcher.has_changed().unwrap());
        assert_eq!(watcher.borrow_and_update().as_ref(), Some(&session));
    }

    #[tokio::test]
    async fn rejected_login_keeps_state() {
        let (sessions, storage) = store();
        let api = FakeAuth {
            token: "abc",
            reject: true,
        };
        let err = sessions
            .login(&api, &LoginRequest::new("alice", "wrong"))
            .await
            .unwrap_err();
        assert!(err.is_auth());
        assert!(!sessions.is_authenticated());
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn empty_token_is_rejected() {
        let (sessions, _) = store();
        let api = FakeAuth {
            token: "",
            reject: false,
        };
        let err = sessions
            .login(&api, &LoginRequest::new("alice", "secret"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
        assert!(sessions.current().is_none());
    }

    #[tokio::test]
    async fn restore_after_restart() {
        let storage = Arc::new(MemoryStore::new());
        let first = SessionStore::new(storage.clone());
        let api = FakeAuth {
            token: "abc",
            reject: false,
        };
        let session = first
            .register(
                &api,
                &RegisterRequest {
                    username: "alice".into(),
                    email: "alice@example.com".into(),
                    password: "pw".into(),
                    full_name: "Alice Doe".into(),
                },
            )
            .await
            .unwrap();

        let second = SessionStore::new(storage);
        assert_eq!(second.phase(), SessionPhase::Restoring);
        assert_eq!(second.restore(), Some(session));
        assert_eq!(second.phase(), SessionPhase::Active);
    }

    #[test]
    fn corrupt_state_is_cleared_silently() {
        let (sessions, storage) = store();
        storage.set(SESSION_KEY, "{not json").unwrap();
        storage.set(TOKEN_KEY, "abc").unwrap();

        assert_eq!(sessions.restore(), None);
        assert_eq!(sessions.phase(), SessionPhase::Cleared);
        assert!(storage.is_empty());
    }

    #[test]
    fn partial_state_is_cleared() {
        let (sessions, storage) = store();
        storage.set(TOKEN_KEY, "abc").unwrap();
        assert_eq!(sessions.restore(), None);
        assert!(storage.is_empty());
    }

    #[test]
    fn logout_is_idempotent() {
        let (sessions, storage) = store();
        sessions.logout().unwrap();
        sessions.logout().unwrap();
        assert!(storage.is_empty());
        assert_eq!(sessions.phase(), SessionPhase::Cleared);
        assert!(sessions.authorization().is_none());
    }

    #[tokio::test]
    async fn clones_share_state() {
        let (sessions, _) = store();
        let clone = sessions.clone();
        let api = FakeAuth {
            token: "abc",
            reject: false,
        };
        sessions
            .login(&api, &LoginRequest::new("alice", "secret"))
            .await
            .unwrap();
        assert!(clone.is_authenticated());
        clone.logout().unwrap();
        assert!(!sessions.is_authenticated());
    }
}
