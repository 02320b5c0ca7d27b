//! Ordered, id-unique list of tracks.
//!
//! The engine keeps the authoritative queue; the controller keeps a display
//! copy built from the same type. Insertion order is playback order and an id
//! never appears twice.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::thread_rng;

use crate::library::{Track, TrackId};

#[derive(Debug, Clone, Default)]
pub struct Queue {
    tracks: Vec<Track>,
    ids: HashSet<TrackId>,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tracks(tracks: Vec<Track>) -> Self {
        let mut queue = Self::new();
        queue.append(tracks);
        queue
    }

    /// Replace the contents, dropping later duplicates of an id.
    pub fn set_all(&mut self, tracks: Vec<Track>) {
        self.clear();
        self.append(tracks);
    }

    /// Append tracks whose id is not already queued. Returns how many were added.
    pub fn append(&mut self, tracks: Vec<Track>) -> usize {
        let before = self.tracks.len();
        for track in tracks {
            if self.ids.insert(track.id) {
                self.tracks.push(track);
            }
        }
        self.tracks.len() - before
    }

    /// Move `track` to the head of the queue, inserting it if absent.
    pub fn push_front(&mut self, track: Track) {
        self.remove_by_id(track.id);
        self.ids.insert(track.id);
        self.tracks.insert(0, track);
    }

    /// Remove the track with `id`, returning its former index.
    pub fn remove_by_id(&mut self, id: TrackId) -> Option<(usize, Track)> {
        if !self.ids.remove(&id) {
            return None;
        }
        let idx = self.tracks.iter().position(|t| t.id == id)?;
        Some((idx, self.tracks.remove(idx)))
    }

    pub fn index_of(&self, id: TrackId) -> Option<usize> {
        if !self.ids.contains(&id) {
            return None;
        }
        self.tracks.iter().position(|t| t.id == id)
    }

    pub fn contains(&self, id: TrackId) -> bool {
        self.ids.contains(&id)
    }

    pub fn get(&self, idx: usize) -> Option<&Track> {
        self.tracks.get(idx)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
        self.ids.clear();
    }

    /// Randomize order in place; membership is unchanged.
    pub fn shuffle(&mut self) {
        self.tracks.shuffle(&mut thread_rng());
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn to_vec(&self) -> Vec<Track> {
        self.tracks.clone()
    }
}
