//! Commands, snapshots and engine states shared by the playback subsystem.

use crate::library::{Track, TrackId};

/// A request from the controller to the engine. Fire-and-forget: the engine
/// alone decides the resulting state.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackCommand {
    /// Replace the queue. Never starts playback by itself.
    SetQueue(Vec<Track>),
    /// Append tracks not yet queued.
    Append(Vec<Track>),
    /// Play the track with this id, or the head of the queue if unknown.
    PlayTrackById(TrackId),
    /// Resume, or start the current queue position when idle.
    Play,
    Pause,
    Next,
    Prev,
    /// Seek to an absolute position in milliseconds.
    Seek(u64),
    /// Tear down the transport and clear the queue.
    Stop,
    /// Remove a track, moving playback to its successor if it was loaded.
    RemoveById(TrackId),
    /// Toggle random selection for `Next`.
    SetShuffle(bool),
    /// Leave the engine loop, optionally fading out over `fade_out_ms` milliseconds.
    Quit { fade_out_ms: u64 },
}

/// Point-in-time playback state published by the engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackSnapshot {
    pub is_playing: bool,
    pub current_track: Option<Track>,
    pub position_ms: u64,
    pub duration_ms: u64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum EngineState {
    /// No track loaded.
    #[default]
    Idle,
    /// The transport is loading a track and cannot be controlled yet.
    Preparing,
    Playing,
    Paused,
    /// The loaded track ran to its end and there was nothing to advance to.
    Completed,
    /// `Stop` was issued; queue and transport are cleared.
    Stopped,
}
