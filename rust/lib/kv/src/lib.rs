//! Local persistent key-value storage.
//!
//! String keys, string values, the same shape as a browser's local storage.
//! The dashboard keeps its cached session here so a restart does not force
//! a new login.

pub mod error;
pub mod memory;
pub mod redb;
pub mod traits;

pub use error::KVError;
pub use memory::MemoryStore;
pub use redb::RedbStore;
pub use traits::KVStore;
