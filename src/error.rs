//! Error types for the taskflow client.
//!
//! [`Error`] covers every failure the synchronization layer can surface:
//! rejected credentials, non-2xx API responses, malformed response bodies,
//! transport failures, and the ambient storage/configuration failures.
//!
//! The enum is `Clone` because the query cache stores the last error of a
//! key and hands copies to every subscriber.

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the taskflow client.
///
/// # Examples
///
/// ```
/// use taskflow::Error;
///
/// let err = Error::api(404, "Task not found");
/// assert_eq!(err.status(), Some(404));
/// assert_eq!(err.to_string(), "Task not found");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The backend rejected a login or registration.
    #[error("{message}")]
    Auth {
        /// HTTP status returned by the backend.
        status: u16,
        /// Message extracted from the error body, or `HTTP <status>`.
        message: String,
    },

    /// Any other non-2xx response.
    #[error("{message}")]
    Api {
        /// HTTP status returned by the backend.
        status: u16,
        /// Message extracted from the error body, or `HTTP <status>`.
        message: String,
    },

    /// A 2xx response whose body could not be decoded.
    #[error("Malformed response: {0}")]
    Parse(String),

    /// Transport failure before an HTTP status was obtained.
    #[error("Network error: {0}")]
    Network(String),

    /// Durable session storage could not be read or written.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid client configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Creates an [`Error::Api`].
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Creates an [`Error::Auth`].
    pub fn auth(status: u16, message: impl Into<String>) -> Self {
        Self::Auth {
            status,
            message: message.into(),
        }
    }

    /// Creates an [`Error::Parse`].
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    /// Creates an [`Error::Network`].
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Creates an [`Error::Storage`].
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Creates an [`Error::Config`].
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// HTTP status carried by the error, if one was obtained.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Auth { status, .. } | Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` for [`Error::Auth`].
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    /// Message suitable for a user-facing notification.
    ///
    /// Falls back to `fallback` when the error carries an empty message.
    ///
    /// ```
    /// use taskflow::Error;
    ///
    /// assert_eq!(Error::api(500, "").user_message("Failed"), "Failed");
    /// assert_eq!(Error::api(500, "boom").user_message("Failed"), "boom");
    /// ```
    pub fn user_message(&self, fallback: &str) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            fallback.to_string()
        } else {
            message
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("TOML parse error: {}", err))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::Config(format!("Invalid URL: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_backend_message() {
        let err = Error::auth(401, "Bad credentials");
        assert_eq!(err.to_string(), "Bad credentials");
        assert!(err.is_auth());
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn network_and_parse_have_no_status() {
        assert_eq!(Error::network("connection refused").status(), None);
        assert_eq!(Error::parse("eof").status(), None);
        assert_eq!(
            Error::parse("eof").to_string(),
            "Malformed response: eof"
        );
    }

    #[test]
    fn user_message_fallback() {
        let err = Error::api(500, "  ");
        assert_eq!(err.user_message("Failed to create task"), "Failed to create task");
        let err = Error::network("refused");
        assert_eq!(err.user_message("x"), "Network error: refused");
    }

    #[test]
    fn serde_error_converts_to_parse() {
        let err: Error = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, Error::Parse(_)));
    }
}
