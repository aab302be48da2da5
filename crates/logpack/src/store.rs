//! Pluggable key-value storage backing the buffer policies.

use std::collections::HashMap;
use std::sync::Mutex;

/// A key-value mapping a buffer persists serialized records into.
///
/// Implementations back the accumulated state with whatever medium suits the
/// host: the default [`MemoryStore`] keeps it in process memory, while a
/// session-scoped implementation lets accumulation survive a navigation
/// boundary. Keys never written read back as absent, not as an error.
pub trait BufferStore: Send + Sync {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: String);

    /// Removes the value stored under `key`, if any.
    fn remove(&self, key: &str);

    /// Returns every key currently present, in no particular order.
    fn keys(&self) -> Vec<String>;
}

/// In-memory [`BufferStore`], the default storage backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl BufferStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
    }

    fn keys(&self) -> Vec<String> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.keys().cloned().collect()
    }
}
