//! Persistence collaborator interface.
//!
//! The registry treats persistence as fire-and-forget: saved-state changes
//! serialize the current saved subset through a [`SavedDeviceStore`], and a
//! store failure never rolls back an in-memory mutation. The on-disk format
//! is the store's concern; only the save/load round trip of identity, name,
//! category, and last-seen is contractual.

use std::sync::Mutex;

use pinpoint_types::SavedDevice;

use crate::error::Result;

/// Saves and loads the user's favorited device list.
///
/// Implementations are synchronous; the registry calls them through
/// `spawn_blocking` so slow storage never stalls the event path.
pub trait SavedDeviceStore: Send + Sync {
    /// Load the persisted saved-device list.
    fn load(&self) -> Result<Vec<SavedDevice>>;

    /// Replace the persisted list with the given snapshot.
    fn save(&self, devices: &[SavedDevice]) -> Result<()>;
}

/// In-memory store for tests and store-less sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Vec<SavedDevice>>,
}

impl MemoryStore {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with saved devices.
    pub fn with_devices(devices: Vec<SavedDevice>) -> Self {
        Self {
            inner: Mutex::new(devices),
        }
    }

    /// Snapshot of the currently stored devices.
    pub fn snapshot(&self) -> Vec<SavedDevice> {
        self.inner.lock().expect("store lock poisoned").clone()
    }
}

impl SavedDeviceStore for MemoryStore {
    fn load(&self) -> Result<Vec<SavedDevice>> {
        Ok(self.snapshot())
    }

    fn save(&self, devices: &[SavedDevice]) -> Result<()> {
        *self.inner.lock().expect("store lock poisoned") = devices.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinpoint_types::DeviceCategory;

    fn saved(id: &str) -> SavedDevice {
        SavedDevice {
            id: id.to_string(),
            name: format!("Device {}", id),
            category: DeviceCategory::Unknown,
            last_seen: None,
        }
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.load().unwrap().is_empty());

        store.save(&[saved("a"), saved("b")]).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, "a");
    }

    #[test]
    fn test_memory_store_save_replaces() {
        let store = MemoryStore::with_devices(vec![saved("a")]);
        store.save(&[saved("b")]).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "b");
    }
}
