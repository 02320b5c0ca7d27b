use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::config::{LibrarySettings, StorageSettings};
use crate::library::{Track, scan};
use crate::store::{
    Favorites, FileFavorites, FilePreferences, FileSessionStore, MemoryFavorites,
    MemoryPreferences, MemorySessionStore, PlaybackPreferences, SessionStore,
};

/// Persistence collaborators handed to the controller and the event loop.
pub struct Stores {
    pub session: Arc<dyn SessionStore>,
    pub preferences: Box<dyn PlaybackPreferences>,
    pub favorites: Box<dyn Favorites>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            session: Arc::new(MemorySessionStore::new()),
            preferences: Box::new(MemoryPreferences::default()),
            favorites: Box::new(MemoryFavorites::new()),
        }
    }
}

/// Open file-backed stores under the data directory. Anything that cannot
/// be opened falls back to an in-memory twin.
pub fn open_stores(storage: &StorageSettings) -> Stores {
    let Some(dir) = storage.resolve_data_dir() else {
        log::warn!("no data directory available, session will not be persisted");
        return Stores::in_memory();
    };
    log::debug!("data directory: {}", dir.display());

    let preferences: Box<dyn PlaybackPreferences> =
        match FilePreferences::open(dir.join("preferences.toml")) {
            Ok(p) => Box::new(p),
            Err(e) => {
                log::warn!("failed to open preferences, using defaults: {e}");
                Box::new(MemoryPreferences::default())
            }
        };
    let favorites: Box<dyn Favorites> = match FileFavorites::open(dir.join("favorites.toml")) {
        Ok(f) => Box::new(f),
        Err(e) => {
            log::warn!("failed to open favorites, starting empty: {e}");
            Box::new(MemoryFavorites::new())
        }
    };

    Stores {
        session: Arc::new(FileSessionStore::new(dir)),
        preferences,
        favorites,
    }
}

/// A scan is due when none was recorded, the clock went backwards, or the
/// last one is at least `interval` old.
pub fn needs_rescan(last_scan: Option<SystemTime>, now: SystemTime, interval: Duration) -> bool {
    match last_scan {
        None => true,
        Some(at) => now.duration_since(at).map_or(true, |age| age >= interval),
    }
}

/// Use the cached library when it is fresh and belongs to `dir`, otherwise
/// rescan `dir` and refresh the cache.
pub fn load_library(
    session: &dyn SessionStore,
    dir: &Path,
    settings: &LibrarySettings,
    now: SystemTime,
) -> Vec<Track> {
    let cached = session.load_library().unwrap_or_else(|e| {
        log::warn!("library cache unreadable: {e}");
        Vec::new()
    });
    let last_scan = session.last_scan_time().unwrap_or_else(|e| {
        log::warn!("last scan time unreadable: {e}");
        None
    });
    let interval = Duration::from_secs(settings.rescan_interval_secs);
    let same_root = cached.iter().all(|t| t.path.starts_with(dir));

    if !cached.is_empty() && same_root && !needs_rescan(last_scan, now, interval) {
        log::info!("using cached library ({} tracks)", cached.len());
        return cached;
    }

    let tracks = scan(dir, settings);
    if let Err(e) = session.save_library(&tracks) {
        log::warn!("failed to cache library: {e}");
    }
    if let Err(e) = session.set_last_scan_time(now) {
        log::warn!("failed to record scan time: {e}");
    }
    tracks
}
