//! Read-only queries over the scanned library.

use std::collections::BTreeMap;

use super::model::{Track, TrackId};

/// One album or artist group with the number of tracks in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupEntry {
    pub name: String,
    pub count: usize,
}

/// Track catalog collaborator used by the front end to build queues.
pub trait Catalog {
    /// Every track, ordered by title.
    fn all_tracks(&self) -> Vec<Track>;
    /// Tracks whose title, album or artist contains `query` (case-insensitive).
    fn search_tracks(&self, query: &str) -> Vec<Track>;
    fn track(&self, id: TrackId) -> Option<Track>;

    fn albums(&self) -> Vec<GroupEntry>;
    fn artists(&self) -> Vec<GroupEntry>;
    fn search_albums(&self, query: &str) -> Vec<GroupEntry>;
    fn search_artists(&self, query: &str) -> Vec<GroupEntry>;

    /// Tracks of one album, matched case-insensitively, ordered by title.
    fn tracks_in_album(&self, album: &str) -> Vec<Track>;
    /// Tracks of one artist, matched case-insensitively, ordered by title.
    fn tracks_by_artist(&self, artist: &str) -> Vec<Track>;
}

/// In-memory catalog over a scanned (or cached) track list.
#[derive(Debug, Clone, Default)]
pub struct LibraryCatalog {
    tracks: Vec<Track>,
}

impl LibraryCatalog {
    pub fn new(mut tracks: Vec<Track>) -> Self {
        tracks.sort_by(|a, b| title_key(a).cmp(&title_key(b)));
        Self { tracks }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    fn groups<'a, F>(&'a self, field: F, query: Option<&str>) -> Vec<GroupEntry>
    where
        F: Fn(&'a Track) -> &'a str,
    {
        let needle = query.map(str::to_lowercase);
        let mut counts: BTreeMap<(String, &'a str), usize> = BTreeMap::new();
        for track in &self.tracks {
            let name = field(track);
            let lower = name.to_lowercase();
            if needle.as_deref().is_some_and(|n| !lower.contains(n)) {
                continue;
            }
            *counts.entry((lower, name)).or_insert(0) += 1;
        }
        counts
            .into_iter()
            .map(|((_, name), count)| GroupEntry {
                name: name.to_string(),
                count,
            })
            .collect()
    }

    fn matching<'a, F>(&'a self, field: F, name: &str) -> Vec<Track>
    where
        F: Fn(&'a Track) -> &'a str,
    {
        let wanted = name.to_lowercase();
        self.tracks
            .iter()
            .filter(|t| field(*t).to_lowercase() == wanted)
            .cloned()
            .collect()
    }
}

fn title_key(track: &Track) -> (String, u64) {
    (track.title.to_lowercase(), track.id.get())
}

impl Catalog for LibraryCatalog {
    fn all_tracks(&self) -> Vec<Track> {
        self.tracks.clone()
    }

    fn search_tracks(&self, query: &str) -> Vec<Track> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.all_tracks();
        }
        self.tracks
            .iter()
            .filter(|t| {
                t.title.to_lowercase().contains(&needle)
                    || t.album.to_lowercase().contains(&needle)
                    || t.artist.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect()
    }

    fn track(&self, id: TrackId) -> Option<Track> {
        self.tracks.iter().find(|t| t.id == id).cloned()
    }

    fn albums(&self) -> Vec<GroupEntry> {
        self.groups(|t| t.album.as_str(), None)
    }

    fn artists(&self) -> Vec<GroupEntry> {
        self.groups(|t| t.artist.as_str(), None)
    }

    fn search_albums(&self, query: &str) -> Vec<GroupEntry> {
        self.groups(|t| t.album.as_str(), Some(query))
    }

    fn search_artists(&self, query: &str) -> Vec<GroupEntry> {
        self.groups(|t| t.artist.as_str(), Some(query))
    }

    fn tracks_in_album(&self, album: &str) -> Vec<Track> {
        self.matching(|t| t.album.as_str(), album)
    }

    fn tracks_by_artist(&self, artist: &str) -> Vec<Track> {
        self.matching(|t| t.artist.as_str(), artist)
    }
}
