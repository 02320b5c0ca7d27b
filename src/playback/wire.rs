//! Flat frames carried over the command and event channels.
//!
//! Commands travel as a discriminator plus a flat payload: a queue is sent as
//! parallel arrays, a single target as `track_id`, a seek target as
//! `position_ms`. Events carry `{playing, track_id, position_ms, duration_ms}`
//! with `track_id == NO_TRACK` meaning nothing is loaded.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::library::{Track, TrackId};

use super::types::{PlaybackCommand, PlaybackSnapshot};

/// Sentinel for "no track" in `track_id` fields.
pub const NO_TRACK: i64 = -1;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandKind {
    SetQueue,
    Append,
    PlayTrackId,
    Play,
    Pause,
    Next,
    Prev,
    Seek,
    Stop,
    RemoveById,
    SetShuffle,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandFrame {
    pub kind: CommandKind,
    #[serde(default)]
    pub ids: Vec<i64>,
    #[serde(default)]
    pub titles: Vec<String>,
    #[serde(default)]
    pub artists: Vec<String>,
    #[serde(default)]
    pub albums: Vec<String>,
    #[serde(default)]
    pub locators: Vec<String>,
    #[serde(default)]
    pub durations_ms: Vec<i64>,
    #[serde(default = "no_track")]
    pub track_id: i64,
    #[serde(default = "no_position")]
    pub position_ms: i64,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub fade_out_ms: u64,
}

fn no_track() -> i64 {
    NO_TRACK
}

fn no_position() -> i64 {
    -1
}

fn id_to_wire(id: TrackId) -> i64 {
    id.get() as i64
}

fn id_from_wire(raw: i64) -> Option<TrackId> {
    (raw >= 0).then(|| TrackId::new(raw as u64))
}

impl CommandFrame {
    fn bare(kind: CommandKind) -> Self {
        Self {
            kind,
            ids: Vec::new(),
            titles: Vec::new(),
            artists: Vec::new(),
            albums: Vec::new(),
            locators: Vec::new(),
            durations_ms: Vec::new(),
            track_id: NO_TRACK,
            position_ms: -1,
            enabled: false,
            fade_out_ms: 0,
        }
    }

    fn with_tracks(kind: CommandKind, tracks: &[Track]) -> Self {
        let mut frame = Self::bare(kind);
        for t in tracks {
            frame.ids.push(id_to_wire(t.id));
            frame.titles.push(t.title.clone());
            frame.artists.push(t.artist.clone());
            frame.albums.push(t.album.clone());
            frame.locators.push(t.path.to_string_lossy().into_owned());
            frame.durations_ms.push(t.duration_ms() as i64);
        }
        frame
    }

    /// Rebuild tracks from the parallel arrays, truncated to the shortest one.
    fn tracks(&self) -> Vec<Track> {
        let len = [
            self.ids.len(),
            self.titles.len(),
            self.artists.len(),
            self.albums.len(),
            self.locators.len(),
            self.durations_ms.len(),
        ]
        .into_iter()
        .min()
        .unwrap_or(0);

        (0..len)
            .filter_map(|i| {
                let id = id_from_wire(self.ids[i])?;
                Some(Track {
                    id,
                    path: PathBuf::from(&self.locators[i]),
                    title: self.titles[i].clone(),
                    artist: self.artists[i].clone(),
                    album: self.albums[i].clone(),
                    duration: Duration::from_millis(self.durations_ms[i].max(0) as u64),
                })
            })
            .collect()
    }

    /// Decode into a command. `None` when the payload does not fit the kind.
    pub fn decode(&self) -> Option<PlaybackCommand> {
        let cmd = match self.kind {
            CommandKind::SetQueue => PlaybackCommand::SetQueue(self.tracks()),
            CommandKind::Append => PlaybackCommand::Append(self.tracks()),
            CommandKind::PlayTrackId => PlaybackCommand::PlayTrackById(id_from_wire(self.track_id)?),
            CommandKind::Play => PlaybackCommand::Play,
            CommandKind::Pause => PlaybackCommand::Pause,
            CommandKind::Next => PlaybackCommand::Next,
            CommandKind::Prev => PlaybackCommand::Prev,
            CommandKind::Seek => {
                if self.position_ms < 0 {
                    return None;
                }
                PlaybackCommand::Seek(self.position_ms as u64)
            }
            CommandKind::Stop => PlaybackCommand::Stop,
            CommandKind::RemoveById => PlaybackCommand::RemoveById(id_from_wire(self.track_id)?),
            CommandKind::SetShuffle => PlaybackCommand::SetShuffle(self.enabled),
            CommandKind::Quit => PlaybackCommand::Quit {
                fade_out_ms: self.fade_out_ms,
            },
        };
        Some(cmd)
    }
}

impl From<&PlaybackCommand> for CommandFrame {
    fn from(cmd: &PlaybackCommand) -> Self {
        match cmd {
            PlaybackCommand::SetQueue(tracks) => Self::with_tracks(CommandKind::SetQueue, tracks),
            PlaybackCommand::Append(tracks) => Self::with_tracks(CommandKind::Append, tracks),
            PlaybackCommand::PlayTrackById(id) => Self {
                track_id: id_to_wire(*id),
                ..Self::bare(CommandKind::PlayTrackId)
            },
            PlaybackCommand::Play => Self::bare(CommandKind::Play),
            PlaybackCommand::Pause => Self::bare(CommandKind::Pause),
            PlaybackCommand::Next => Self::bare(CommandKind::Next),
            PlaybackCommand::Prev => Self::bare(CommandKind::Prev),
            PlaybackCommand::Seek(ms) => Self {
                position_ms: (*ms).min(i64::MAX as u64) as i64,
                ..Self::bare(CommandKind::Seek)
            },
            PlaybackCommand::Stop => Self::bare(CommandKind::Stop),
            PlaybackCommand::RemoveById(id) => Self {
                track_id: id_to_wire(*id),
                ..Self::bare(CommandKind::RemoveById)
            },
            PlaybackCommand::SetShuffle(enabled) => Self {
                enabled: *enabled,
                ..Self::bare(CommandKind::SetShuffle)
            },
            PlaybackCommand::Quit { fade_out_ms } => Self {
                fade_out_ms: *fade_out_ms,
                ..Self::bare(CommandKind::Quit)
            },
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFrame {
    pub playing: bool,
    pub track_id: i64,
    pub position_ms: i64,
    pub duration_ms: i64,
}

impl EventFrame {
    pub fn track_id(&self) -> Option<TrackId> {
        id_from_wire(self.track_id)
    }

    pub fn position_ms(&self) -> u64 {
        self.position_ms.max(0) as u64
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms.max(0) as u64
    }
}

impl From<&PlaybackSnapshot> for EventFrame {
    fn from(s: &PlaybackSnapshot) -> Self {
        Self {
            playing: s.is_playing,
            track_id: s.current_track.as_ref().map_or(NO_TRACK, |t| id_to_wire(t.id)),
            position_ms: s.position_ms.min(i64::MAX as u64) as i64,
            duration_ms: s.duration_ms.min(i64::MAX as u64) as i64,
        }
    }
}
