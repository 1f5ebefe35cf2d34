//! In-memory [`KeyValueStore`].

use std::collections::HashMap;

use parking_lot::RwLock;

use super::{validate_key, KeyValueStore};
use crate::error::Result;

/// Thread-safe in-memory store.
///
/// # Examples
///
/// ```
/// use taskflow::storage::{KeyValueStore, MemoryStore};
///
/// let store = MemoryStore::new();
/// store.set("token", "abc").unwrap();
/// assert_eq!(store.get("token").unwrap().as_deref(), Some("abc"));
/// store.remove("token").unwrap();
/// assert!(store.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        Ok(self.data.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        self.data.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        self.data.write().remove(key);
        Ok(())
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<()> {
        for (key, _) in entries {
            validate_key(key)?;
        }
        // Single lock so readers never see half of the entries.
        let mut data = self.data.write();
        for (key, value) in entries {
            data.insert((*key).to_string(), (*value).to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get("session").unwrap(), None);
        store.set("session", "{}").unwrap();
        assert_eq!(store.get("session").unwrap().as_deref(), Some("{}"));
        store.remove("session").unwrap();
        store.remove("session").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn set_many_is_all_or_nothing_on_bad_key() {
        let store = MemoryStore::new();
        assert!(store.set_many(&[("token", "t"), ("bad key", "x")]).is_err());
        assert!(store.is_empty());

        store.set_many(&[("token", "t"), ("session", "s")]).unwrap();
        assert_eq!(store.len(), 2);
    }
}
