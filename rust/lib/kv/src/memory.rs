use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::error::KVError;
use crate::traits::KVStore;

/// In-process KVStore. Nothing survives the process; used by tests and by
/// callers that opt out of a session file.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KVStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, KVError> {
        Ok(self.entries.read().unwrap().get(key).cloned())
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), KVError> {
        let mut map = self.entries.write().unwrap();
        for (key, value) in entries {
            map.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }

    fn remove_many(&self, keys: &[&str]) -> Result<(), KVError> {
        let mut map = self.entries.write().unwrap();
        for key in keys {
            map.remove(*key);
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, KVError> {
        Ok(self.entries.read().unwrap().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get("jwtToken").unwrap(), None);

        store.set("jwtToken", "abc").unwrap();
        assert_eq!(store.get("jwtToken").unwrap().as_deref(), Some("abc"));

        store.remove("jwtToken").unwrap();
        assert_eq!(store.get("jwtToken").unwrap(), None);
    }

    #[test]
    fn remove_missing_key_is_ok() {
        let store = MemoryStore::new();
        store.remove("nope").unwrap();
    }

    #[test]
    fn keys_are_sorted() {
        let store = MemoryStore::new();
        store
            .set_many(&[("userRole", "admin"), ("jwtToken", "t"), ("userEmail", "a@b.co")])
            .unwrap();
        assert_eq!(store.keys().unwrap(), vec!["jwtToken", "userEmail", "userRole"]);
    }
}
