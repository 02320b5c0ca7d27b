//! Persistence collaborators: the session store (queue, scan time, library
//! cache), favorite lists and playback preferences.
//!
//! File-backed implementations keep one TOML document each under the data
//! directory and replace it atomically on every write. In-memory twins back
//! the tests and headless runs without a data directory.

mod favorites;
mod preferences;
mod session;
mod writer;

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StoreError;

pub use favorites::{Favorites, FileFavorites, MemoryFavorites};
pub use preferences::{FilePreferences, MemoryPreferences, PlaybackPreferences};
pub use session::{FileSessionStore, MemorySessionStore, SessionStore};
pub use writer::QueueWriter;

/// Read a TOML document, treating a missing file as the default value.
fn read_toml<T: DeserializeOwned + Default>(path: &Path) -> Result<T, StoreError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(toml::from_str(&text)?),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(e.into()),
    }
}

/// Write through a sibling temp file and rename it over `path`.
fn write_toml<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let text = toml::to_string_pretty(value)?;
    let tmp = path.with_extension("toml.tmp");
    fs::write(&tmp, text)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// A poisoned lock only means another writer panicked mid-update; the
/// guarded data is plain values and stays usable.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
