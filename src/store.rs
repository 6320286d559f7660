//! Credential persistence.
//!
//! The engine persists `{sid, token}` through this trait so a session can
//! be re-established after a restart. The default in-memory store is
//! enough for tests and short-lived processes; embedders supply their own
//! implementation backed by whatever key-value storage the platform has.

use dashmap::DashMap;

/// Store key for the cached session id.
pub const KEY_SID: &str = "sid";
/// Store key for the cached session token.
pub const KEY_TOKEN: &str = "token";

/// A key-value credential store. Logically single-writer: only the engine
/// mutates it.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn put(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
    fn clear(&self);

    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

/// Volatile in-memory store, the default when none is supplied.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|e| e.value().clone())
    }

    fn put(&self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.remove(key);
    }

    fn clear(&self) {
        self.entries.clear();
    }
}
