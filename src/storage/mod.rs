//! Durable key-value storage for client state.
//!
//! The session store persists two entries, [`SESSION_KEY`] and
//! [`TOKEN_KEY`], through a [`KeyValueStore`]. Two implementations ship
//! with the crate:
//!
//! - [`FileStore`](file::FileStore) -- one file per key inside a private
//!   directory, replaced atomically on every write.
//! - [`MemoryStore`](memory::MemoryStore) -- process-local map, used for
//!   tests and for sessions that must not outlive the process.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::{Error, Result};

/// Storage key holding the serialized [`Session`](crate::types::Session).
pub const SESSION_KEY: &str = "session";

/// Storage key holding the raw bearer token.
pub const TOKEN_KEY: &str = "token";

/// Minimal durable key-value interface.
///
/// Implementations must make `remove` idempotent: removing a missing key is
/// not an error.
pub trait KeyValueStore: Send + Sync {
    /// Read a value. `Ok(None)` when the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a value.
    fn remove(&self, key: &str) -> Result<()>;

    /// Write several values. The default writes them in order.
    fn set_many(&self, entries: &[(&str, &str)]) -> Result<()> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }

    /// Delete several values, attempting every key even if one fails.
    fn remove_many(&self, keys: &[&str]) -> Result<()> {
        let mut first_error = None;
        for key in keys {
            if let Err(e) = self.remove(key) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// Reject keys that cannot safely become file names.
pub(crate) fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(Error::storage(format!("invalid storage key '{}'", key)))
    }
}
