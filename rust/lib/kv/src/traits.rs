use crate::error::KVError;

/// KVStore is a small string-to-string store with atomic multi-key writes.
///
/// Keys are fixed names chosen by the caller (`jwtToken`, `userEmail`, ...).
/// `set_many` and `remove_many` apply all entries or none, so a reader never
/// observes half of a session.
pub trait KVStore: Send + Sync {
    /// Get the value for a key. Returns None if the key does not exist.
    fn get(&self, key: &str) -> Result<Option<String>, KVError>;

    /// Set a single key.
    fn set(&self, key: &str, value: &str) -> Result<(), KVError> {
        self.set_many(&[(key, value)])
    }

    /// Remove a single key. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), KVError> {
        self.remove_many(&[key])
    }

    /// Set several keys in one transaction.
    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), KVError>;

    /// Remove several keys in one transaction.
    fn remove_many(&self, keys: &[&str]) -> Result<(), KVError>;

    /// All stored keys, sorted.
    fn keys(&self) -> Result<Vec<String>, KVError>;
}
