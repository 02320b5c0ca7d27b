use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const UNKNOWN_ARTIST: &str = "Unknown artist";
pub const UNKNOWN_ALBUM: &str = "Unknown album";

/// Opaque, stable identifier of a track.
///
/// Ids are kept within the non-negative `i64` range so they survive the wire
/// format (which reserves `-1` for "no track") and TOML integers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(u64);

impl TrackId {
    const MASK: u64 = i64::MAX as u64;

    pub fn new(raw: u64) -> Self {
        Self(raw & Self::MASK)
    }

    /// Derive an id from the media path, stable across rescans.
    pub fn from_path(path: &Path) -> Self {
        let digest = md5::compute(path.to_string_lossy().as_bytes());
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest.0[..8]);
        Self::new(u64::from_be_bytes(head))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An immutable track record. Equality and hashing use `id` only.
#[derive(Debug, Clone)]
pub struct Track {
    pub id: TrackId,
    /// Media locator handed to the transport.
    pub path: PathBuf,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration: Duration,
}

impl Track {
    pub fn duration_ms(&self) -> u64 {
        self.duration.as_millis() as u64
    }

    /// "Artist - Title", or just the title when the artist is unknown.
    pub fn display(&self) -> String {
        let artist = self.artist.trim();
        if artist.is_empty() || artist == UNKNOWN_ARTIST {
            self.title.clone()
        } else {
            format!("{} - {}", artist, self.title)
        }
    }
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Track {}

impl Hash for Track {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
