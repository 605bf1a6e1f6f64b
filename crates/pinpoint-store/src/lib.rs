//! Saved-device persistence for Pinpoint.
//!
//! This crate provides SQLite-based storage for the user's favorited
//! device list, implementing the core's [`pinpoint_core::SavedDeviceStore`]
//! trait. Only identity, name, category, and the last-seen stamp survive
//! the round trip; live state is the registry's concern.
//!
//! # Example
//!
//! ```no_run
//! use pinpoint_store::Store;
//!
//! let store = Store::open_default()?;
//! let saved = store.load_saved()?;
//! println!("{} saved device(s)", saved.len());
//! # Ok::<(), pinpoint_store::Error>(())
//! ```

mod error;
mod store;

pub use error::{Error, Result};
pub use store::Store;

/// Default database path following platform conventions.
///
/// - Linux: `~/.local/share/pinpoint/devices.db`
/// - macOS: `~/Library/Application Support/pinpoint/devices.db`
/// - Windows: `C:\Users\<user>\AppData\Local\pinpoint\devices.db`
pub fn default_db_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("pinpoint")
        .join("devices.db")
}
