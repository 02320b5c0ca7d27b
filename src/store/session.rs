use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::library::{Track, TrackId};

use super::{lock, read_toml, write_toml};

/// Key/value persistence of the session: the current queue, when the
/// library was last scanned, and a cache of the scanned library.
///
/// `save_queue` overwrites; `load_queue` returns tracks in the order they
/// were saved.
pub trait SessionStore: Send + Sync {
    fn save_queue(&self, tracks: &[Track]) -> Result<(), StoreError>;
    fn load_queue(&self) -> Result<Vec<Track>, StoreError>;

    fn last_scan_time(&self) -> Result<Option<SystemTime>, StoreError>;
    fn set_last_scan_time(&self, at: SystemTime) -> Result<(), StoreError>;

    fn save_library(&self, tracks: &[Track]) -> Result<(), StoreError>;
    fn load_library(&self) -> Result<Vec<Track>, StoreError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredTrack {
    /// Sequence index within the saved list.
    position: usize,
    id: TrackId,
    title: String,
    artist: String,
    album: String,
    path: PathBuf,
    duration_ms: u64,
}

impl StoredTrack {
    fn new(position: usize, t: &Track) -> Self {
        Self {
            position,
            id: t.id,
            title: t.title.clone(),
            artist: t.artist.clone(),
            album: t.album.clone(),
            path: t.path.clone(),
            duration_ms: t.duration_ms(),
        }
    }

    fn into_track(self) -> Track {
        Track {
            id: self.id,
            path: self.path,
            title: self.title,
            artist: self.artist,
            album: self.album,
            duration: Duration::from_millis(self.duration_ms),
        }
    }
}

fn to_stored(tracks: &[Track]) -> Vec<StoredTrack> {
    tracks
        .iter()
        .enumerate()
        .map(|(i, t)| StoredTrack::new(i, t))
        .collect()
}

fn from_stored(mut stored: Vec<StoredTrack>) -> Vec<Track> {
    stored.sort_by_key(|s| s.position);
    stored.into_iter().map(StoredTrack::into_track).collect()
}

// Scalars precede arrays of tables in TOML output.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct SessionFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    last_scan_time_ms: Option<u64>,
    queue: Vec<StoredTrack>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct LibraryFile {
    tracks: Vec<StoredTrack>,
}

fn to_millis(at: SystemTime) -> u64 {
    at.duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64)
}

fn from_millis(ms: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_millis(ms)
}

/// `session.toml` and `library.toml` inside a data directory.
pub struct FileSessionStore {
    session_path: PathBuf,
    library_path: PathBuf,
    // Serializes read-modify-write cycles on the session file.
    guard: Mutex<()>,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            session_path: dir.join("session.toml"),
            library_path: dir.join("library.toml"),
            guard: Mutex::new(()),
        }
    }

    fn update_session(&self, f: impl FnOnce(&mut SessionFile)) -> Result<(), StoreError> {
        let _g = lock(&self.guard);
        let mut session = match read_toml::<SessionFile>(&self.session_path) {
            Ok(s) => s,
            Err(StoreError::Decode(e)) => {
                log::warn!(
                    "discarding unreadable session file {}: {e}",
                    self.session_path.display()
                );
                SessionFile::default()
            }
            Err(e) => return Err(e),
        };
        f(&mut session);
        write_toml(&self.session_path, &session)
    }

    fn read_session(&self) -> Result<SessionFile, StoreError> {
        let _g = lock(&self.guard);
        read_toml(&self.session_path)
    }
}

impl SessionStore for FileSessionStore {
    fn save_queue(&self, tracks: &[Track]) -> Result<(), StoreError> {
        let queue = to_stored(tracks);
        self.update_session(|s| s.queue = queue)
    }

    fn load_queue(&self) -> Result<Vec<Track>, StoreError> {
        Ok(from_stored(self.read_session()?.queue))
    }

    fn last_scan_time(&self) -> Result<Option<SystemTime>, StoreError> {
        Ok(self.read_session()?.last_scan_time_ms.map(from_millis))
    }

    fn set_last_scan_time(&self, at: SystemTime) -> Result<(), StoreError> {
        self.update_session(|s| s.last_scan_time_ms = Some(to_millis(at)))
    }

    fn save_library(&self, tracks: &[Track]) -> Result<(), StoreError> {
        write_toml(
            &self.library_path,
            &LibraryFile {
                tracks: to_stored(tracks),
            },
        )
    }

    fn load_library(&self) -> Result<Vec<Track>, StoreError> {
        let file: LibraryFile = read_toml(&self.library_path)?;
        Ok(from_stored(file.tracks))
    }
}

#[derive(Debug, Default)]
struct MemorySession {
    queue: Vec<Track>,
    last_scan: Option<SystemTime>,
    library: Vec<Track>,
}

/// Volatile store for tests and runs without a data directory.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    inner: Mutex<MemorySession>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn save_queue(&self, tracks: &[Track]) -> Result<(), StoreError> {
        lock(&self.inner).queue = tracks.to_vec();
        Ok(())
    }

    fn load_queue(&self) -> Result<Vec<Track>, StoreError> {
        Ok(lock(&self.inner).queue.clone())
    }

    fn last_scan_time(&self) -> Result<Option<SystemTime>, StoreError> {
        Ok(lock(&self.inner).last_scan)
    }

    fn set_last_scan_time(&self, at: SystemTime) -> Result<(), StoreError> {
        lock(&self.inner).last_scan = Some(at);
        Ok(())
    }

    fn save_library(&self, tracks: &[Track]) -> Result<(), StoreError> {
        lock(&self.inner).library = tracks.to_vec();
        Ok(())
    }

    fn load_library(&self) -> Result<Vec<Track>, StoreError> {
        Ok(lock(&self.inner).library.clone())
    }
}
