//! Authentication wire types and the client-side [`Session`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Body of `POST /auth/login`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Account name.
    pub username: String,
    /// Plain-text password, sent over the transport only.
    pub password: String,
}

impl LoginRequest {
    /// Create a login request.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Body of `POST /auth/register`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Account name.
    pub username: String,
    /// Contact address.
    pub email: String,
    /// Plain-text password.
    pub password: String,
    /// Display name.
    pub full_name: String,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("full_name", &self.full_name)
            .finish()
    }
}

/// Successful response of login and register.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    /// Bearer token for subsequent requests.
    pub token: String,
    /// Token scheme, normally `Bearer`.
    #[serde(rename = "type", default = "default_token_type")]
    pub token_type: String,
    /// User id.
    pub id: i64,
    /// Account name.
    pub username: String,
    /// Contact address.
    pub email: String,
    /// Display name.
    pub full_name: String,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl fmt::Debug for AuthResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthResponse")
            .field("token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("id", &self.id)
            .field("username", &self.username)
            .finish()
    }
}

/// Authenticated identity plus bearer token held by the client.
///
/// A session is either fully present with a non-empty token or absent;
/// [`Session::from_auth`] refuses to build one from an empty token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Bearer token.
    pub token: String,
    /// Token scheme, normally `Bearer`.
    #[serde(rename = "type", default = "default_token_type")]
    pub token_type: String,
    /// User id.
    #[serde(rename = "id")]
    pub user_id: i64,
    /// Account name.
    pub username: String,
    /// Display name.
    pub full_name: String,
    /// Contact address.
    pub email: String,
}

impl Session {
    /// Build a session from an auth response. Returns `None` for an empty token.
    pub fn from_auth(response: AuthResponse) -> Option<Self> {
        if response.token.trim().is_empty() {
            return None;
        }
        Some(Self {
            token: response.token,
            token_type: response.token_type,
            user_id: response.id,
            username: response.username,
            full_name: response.full_name,
            email: response.email,
        })
    }

    /// `true` when the session satisfies the "fully present" invariant.
    pub fn is_valid(&self) -> bool {
        !self.token.trim().is_empty()
    }

    /// `Authorization` header value for this session.
    ///
    /// Always the `Bearer` scheme; `token_type` is informational only.
    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"[REDACTED]")
            .field("user_id", &self.user_id)
            .field("username", &self.username)
            .field("full_name", &self.full_name)
            .field("email", &self.email)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn auth(token: &str) -> AuthResponse {
        serde_json::from_value(json!({
            "token": token,
            "type": "Bearer",
            "id": 3,
            "username": "alice",
            "email": "alice@example.com",
            "fullName": "Alice Doe"
        }))
        .unwrap()
    }

    #[test]
    fn session_from_auth_response() {
        let session = Session::from_auth(auth("abc")).unwrap();
        assert_eq!(session.user_id, 3);
        assert_eq!(session.full_name, "Alice Doe");
        assert_eq!(session.authorization(), "Bearer abc");
    }

    #[test]
    fn authorization_is_always_bearer() {
        let mut response = auth("abc");
        response.token_type = "JWT".to_string();
        let session = Session::from_auth(response).unwrap();
        assert_eq!(session.token_type, "JWT");
        assert_eq!(session.authorization(), "Bearer abc");
    }

    #[test]
    fn empty_token_is_not_a_session() {
        assert!(Session::from_auth(auth("")).is_none());
        assert!(Session::from_auth(auth("   ")).is_none());
    }

    #[test]
    fn debug_redacts_secrets() {
        let session = Session::from_auth(auth("super-secret")).unwrap();
        assert!(!format!("{:?}", session).contains("super-secret"));
        let login = LoginRequest::new("alice", "hunter2");
        assert!(!format!("{:?}", login).contains("hunter2"));
    }

    #[test]
    fn register_request_uses_camel_case() {
        let req = RegisterRequest {
            username: "bob".into(),
            email: "bob@example.com".into(),
            password: "pw".into(),
            full_name: "Bob".into(),
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["fullName"], json!("Bob"));
    }

    #[test]
    fn missing_token_type_defaults_to_bearer() {
        let response: AuthResponse = serde_json::from_value(json!({
            "token": "t",
            "id": 1,
            "username": "u",
            "email": "e",
            "fullName": "f"
        }))
        .unwrap();
        assert_eq!(response.token_type, "Bearer");
    }
}
