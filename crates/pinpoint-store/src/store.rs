//! SQLite store for the saved-device list.

use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use rusqlite::Connection;
use time::OffsetDateTime;
use tracing::{info, warn};

use pinpoint_types::{DeviceCategory, SavedDevice};

use crate::error::{Error, Result};

/// SQLite-backed persistence for the user's favorited devices.
///
/// The connection sits behind a mutex so the store can be shared across
/// the blocking-pool calls the registry makes.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        info!("Opening database at {}", path.display());
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;
        initialize(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open the default database location.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::default_db_path())
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        initialize(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Load the persisted saved-device list.
    pub fn load_saved(&self) -> Result<Vec<SavedDevice>> {
        let conn = self.conn.lock().expect("store lock poisoned");
        let mut statement = conn.prepare(
            "SELECT id, name, category, last_seen FROM saved_devices ORDER BY name, id",
        )?;

        let rows = statement.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<i64>>(3)?,
            ))
        })?;

        let mut devices = Vec::new();
        for row in rows {
            let (id, name, category, last_seen) = row?;
            let category = DeviceCategory::from_str(&category)
                .map_err(|_| Error::InvalidCategory(category))?;
            let last_seen = last_seen.and_then(|ts| {
                OffsetDateTime::from_unix_timestamp(ts)
                    .map_err(|e| warn!("discarding invalid last_seen for {}: {}", id, e))
                    .ok()
            });
            devices.push(SavedDevice {
                id,
                name,
                category,
                last_seen,
            });
        }

        Ok(devices)
    }

    /// Replace the persisted list with the given snapshot.
    pub fn save_saved(&self, devices: &[SavedDevice]) -> Result<()> {
        let mut conn = self.conn.lock().expect("store lock poisoned");
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM saved_devices", [])?;
        {
            let mut statement = tx.prepare(
                "INSERT INTO saved_devices (id, name, category, last_seen)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for device in devices {
                statement.execute(rusqlite::params![
                    device.id,
                    device.name,
                    device.category.to_string(),
                    device.last_seen.map(|ts| ts.unix_timestamp()),
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

impl pinpoint_core::SavedDeviceStore for Store {
    fn load(&self) -> pinpoint_core::Result<Vec<SavedDevice>> {
        self.load_saved()
            .map_err(|e| pinpoint_core::Error::Persistence(e.to_string()))
    }

    fn save(&self, devices: &[SavedDevice]) -> pinpoint_core::Result<()> {
        self.save_saved(devices)
            .map_err(|e| pinpoint_core::Error::Persistence(e.to_string()))
    }
}

/// Initialize the database schema.
fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS saved_devices (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            category TEXT NOT NULL,
            last_seen INTEGER
        );
        "#,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn saved(id: &str, name: &str, category: DeviceCategory) -> SavedDevice {
        SavedDevice {
            id: id.to_string(),
            name: name.to_string(),
            category,
            last_seen: Some(OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap()),
        }
    }

    #[test]
    fn test_roundtrip_in_memory() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.load_saved().unwrap().is_empty());

        let devices = vec![
            saved("AA:BB", "Pixel Buds", DeviceCategory::Headphones),
            saved("CC:DD", "Galaxy Watch6", DeviceCategory::Watch),
        ];
        store.save_saved(&devices).unwrap();

        let loaded = store.load_saved().unwrap();
        assert_eq!(loaded.len(), 2);
        // Ordered by name
        assert_eq!(loaded[0].name, "Galaxy Watch6");
        assert_eq!(loaded[0].category, DeviceCategory::Watch);
        assert_eq!(loaded[1].id, "AA:BB");
        assert_eq!(
            loaded[1].last_seen.unwrap().unix_timestamp(),
            1_700_000_000
        );
    }

    #[test]
    fn test_save_replaces_previous_snapshot() {
        let store = Store::open_in_memory().unwrap();
        store
            .save_saved(&[saved("a", "One", DeviceCategory::Mouse)])
            .unwrap();
        store
            .save_saved(&[saved("b", "Two", DeviceCategory::Keyboard)])
            .unwrap();

        let loaded = store.load_saved().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "b");
    }

    #[test]
    fn test_empty_snapshot_clears_table() {
        let store = Store::open_in_memory().unwrap();
        store
            .save_saved(&[saved("a", "One", DeviceCategory::Mouse)])
            .unwrap();
        store.save_saved(&[]).unwrap();
        assert!(store.load_saved().unwrap().is_empty());
    }

    #[test]
    fn test_roundtrip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices.db");

        {
            let store = Store::open(&path).unwrap();
            store
                .save_saved(&[saved("AA:BB", "Pixel Buds", DeviceCategory::Headphones)])
                .unwrap();
        }

        // A fresh handle over the same file sees the persisted list.
        let store = Store::open(&path).unwrap();
        let loaded = store.load_saved().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "Pixel Buds");
    }

    #[test]
    fn test_null_last_seen() {
        let store = Store::open_in_memory().unwrap();
        let mut device = saved("a", "One", DeviceCategory::Unknown);
        device.last_seen = None;
        store.save_saved(&[device]).unwrap();
        assert!(store.load_saved().unwrap()[0].last_seen.is_none());
    }

    #[test]
    fn test_trait_impl_maps_errors() {
        use pinpoint_core::SavedDeviceStore as _;
        let store = Store::open_in_memory().unwrap();
        store
            .save(&[saved("a", "One", DeviceCategory::Speaker)])
            .unwrap();
        assert_eq!(store.load().unwrap().len(), 1);
    }
}
