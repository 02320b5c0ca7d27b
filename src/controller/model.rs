//! `PlaybackController`: last-known engine state plus the local queue copy.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crate::library::{Track, TrackId};
use crate::playback::wire::EventFrame;
use crate::playback::{CommandSender, PlaybackCommand, PlaybackSnapshot, Queue};
use crate::store::{PlaybackPreferences, QueueWriter, SessionStore};

/// Single writer rules: the engine owns `is_playing`, `current_track`,
/// `duration_ms` and (unless the user is seeking) `position_ms`; this side
/// owns the queue copy until the next event realigns the current position.
pub struct PlaybackController {
    commands: CommandSender,
    events: Receiver<EventFrame>,
    preferences: Box<dyn PlaybackPreferences>,
    writer: QueueWriter,

    queue: Queue,
    current_index: Option<usize>,
    queue_version: u64,
    shuffle_enabled: bool,

    is_playing: bool,
    current_track: Option<Track>,
    position_ms: u64,
    duration_ms: u64,
    last_tick: Instant,
    user_seeking: bool,
}

impl PlaybackController {
    /// Restore the persisted queue and push it, with the shuffle preference,
    /// to the engine. Nothing starts playing.
    pub fn new(
        commands: CommandSender,
        events: Receiver<EventFrame>,
        session: Arc<dyn SessionStore>,
        preferences: Box<dyn PlaybackPreferences>,
    ) -> Self {
        let restored = session.load_queue().unwrap_or_else(|e| {
            log::warn!("could not restore the queue: {e}");
            Vec::new()
        });
        let queue = Queue::from_tracks(restored);
        let shuffle_enabled = preferences.shuffle_enabled();

        commands.dispatch(PlaybackCommand::SetShuffle(shuffle_enabled));
        if !queue.is_empty() {
            log::info!("restored queue of {} tracks", queue.len());
            commands.dispatch(PlaybackCommand::SetQueue(queue.to_vec()));
        }

        Self {
            commands,
            events,
            preferences,
            writer: QueueWriter::spawn(session),
            current_index: (!queue.is_empty()).then_some(0),
            queue,
            queue_version: 0,
            shuffle_enabled,
            is_playing: false,
            current_track: None,
            position_ms: 0,
            duration_ms: 0,
            last_tick: Instant::now(),
            user_seeking: false,
        }
    }

    pub fn queue(&self) -> &[Track] {
        self.queue.tracks()
    }

    /// Bumped on every local queue mutation.
    pub fn queue_version(&self) -> u64 {
        self.queue_version
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current_track.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn position_ms(&self) -> u64 {
        self.position_ms
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn shuffle_enabled(&self) -> bool {
        self.shuffle_enabled
    }

    pub fn is_queued(&self, id: TrackId) -> bool {
        self.queue.contains(id)
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            is_playing: self.is_playing,
            current_track: self.current_track.clone(),
            position_ms: self.position_ms,
            duration_ms: self.duration_ms,
        }
    }

    /// Playback progress in `[0, 1]`; zero when the duration is unknown.
    pub fn progress(&self) -> f32 {
        if self.duration_ms == 0 {
            return 0.0;
        }
        self.position_ms.min(self.duration_ms) as f32 / self.duration_ms as f32
    }

    fn queue_changed(&mut self) {
        self.queue_version += 1;
        self.writer.save(self.queue.to_vec());
    }

    fn realign_current(&mut self) {
        self.current_index = match &self.current_track {
            Some(t) => self.queue.index_of(t.id),
            None => None,
        }
        .or(self.current_index.filter(|i| *i < self.queue.len()))
        .or((!self.queue.is_empty()).then_some(0));
    }

    fn reset_now_playing(&mut self) {
        self.current_index = None;
        self.current_track = None;
        self.is_playing = false;
        self.position_ms = 0;
        self.duration_ms = 0;
    }

    /// Optimistically show `index` as current and ask the engine to play it.
    fn play_at(&mut self, index: usize) {
        let Some(track) = self.queue.get(index).cloned() else {
            return;
        };
        self.current_index = Some(index);
        self.duration_ms = track.duration_ms();
        self.position_ms = 0;
        self.last_tick = Instant::now();
        let id = track.id;
        self.current_track = Some(track);
        self.commands.dispatch(PlaybackCommand::PlayTrackById(id));
    }

    pub fn set_queue(&mut self, tracks: Vec<Track>) {
        self.queue.set_all(tracks);
        self.realign_current();
        self.queue_changed();
        self.commands
            .dispatch(PlaybackCommand::SetQueue(self.queue.to_vec()));
    }

    pub fn add_track(&mut self, track: Track) {
        self.add_tracks(vec![track]);
    }

    /// Append tracks that are not queued yet.
    pub fn add_tracks(&mut self, tracks: Vec<Track>) {
        let before = self.queue.len();
        if self.queue.append(tracks) == 0 {
            return;
        }
        let added = self.queue.tracks()[before..].to_vec();
        if self.current_index.is_none() {
            self.current_index = Some(0);
        }
        self.queue_changed();
        self.commands.dispatch(PlaybackCommand::Append(added));
    }

    pub fn remove_by_id(&mut self, id: TrackId) {
        let Some((idx, _)) = self.queue.remove_by_id(id) else {
            return;
        };
        let was_current = self.current_track.as_ref().is_some_and(|t| t.id == id);

        if self.queue.is_empty() {
            self.reset_now_playing();
        } else if was_current {
            // The engine moves on to whatever took the removed slot.
            let successor = idx.min(self.queue.len() - 1);
            self.current_index = Some(successor);
            self.current_track = self.queue.get(successor).cloned();
            self.duration_ms = self.current_track.as_ref().map_or(0, Track::duration_ms);
            self.position_ms = 0;
        } else {
            self.realign_current();
        }
        self.queue_changed();
        self.commands.dispatch(PlaybackCommand::RemoveById(id));
    }

    /// Drop the whole queue. The engine tears playback down.
    pub fn clear_queue(&mut self) {
        self.stop();
    }

    /// Reorder the queue randomly. The current track keeps playing.
    pub fn shuffle_queue(&mut self) {
        if self.queue.is_empty() {
            return;
        }
        self.queue.shuffle();
        self.realign_current();
        self.queue_changed();
        self.commands
            .dispatch(PlaybackCommand::SetQueue(self.queue.to_vec()));
    }

    /// Move (or insert) `track` to the head of the queue and play it.
    pub fn play_track(&mut self, track: Track) {
        self.queue.push_front(track);
        self.queue_changed();
        self.commands
            .dispatch(PlaybackCommand::SetQueue(self.queue.to_vec()));
        self.play_at(0);
    }

    /// Jump to `track` if it is queued, otherwise behave like `play_track`.
    pub fn play_if_queued(&mut self, track: Track) {
        match self.queue.index_of(track.id) {
            Some(idx) => self.play_at(idx),
            None => self.play_track(track),
        }
    }

    pub fn play_by_id(&mut self, id: TrackId) {
        let idx = self
            .queue
            .index_of(id)
            .or((!self.queue.is_empty()).then_some(0));
        match idx {
            Some(idx) => self.play_at(idx),
            None => self.commands.dispatch(PlaybackCommand::PlayTrackById(id)),
        }
    }

    pub fn play(&mut self) {
        self.commands.dispatch(PlaybackCommand::Play);
    }

    pub fn pause(&mut self) {
        self.commands.dispatch(PlaybackCommand::Pause);
    }

    pub fn toggle_play_pause(&mut self) {
        if self.is_playing {
            self.pause();
        } else if self.current_track.is_none() && !self.queue.is_empty() {
            let idx = self.current_index.filter(|i| *i < self.queue.len()).unwrap_or(0);
            self.play_at(idx);
        } else {
            self.play();
        }
    }

    pub fn next(&mut self) {
        self.commands.dispatch(PlaybackCommand::Next);
    }

    pub fn prev(&mut self) {
        self.commands.dispatch(PlaybackCommand::Prev);
    }

    pub fn seek(&mut self, position_ms: u64) {
        if self.current_track.is_none() {
            log::debug!("seek ignored: nothing is loaded");
            return;
        }
        self.position_ms = if self.duration_ms > 0 {
            position_ms.min(self.duration_ms)
        } else {
            position_ms
        };
        self.last_tick = Instant::now();
        self.commands.dispatch(PlaybackCommand::Seek(position_ms));
    }

    /// Seek to a fraction of the current duration. Ignored while the
    /// duration is unknown.
    pub fn seek_to_fraction(&mut self, fraction: f32) {
        if self.duration_ms == 0 {
            return;
        }
        let target = (self.duration_ms as f64 * f64::from(fraction.clamp(0.0, 1.0))) as u64;
        self.seek(target);
    }

    pub fn stop(&mut self) {
        self.queue.clear();
        self.reset_now_playing();
        self.queue_changed();
        self.commands.dispatch(PlaybackCommand::Stop);
    }

    pub fn set_shuffle_mode(&mut self, enabled: bool) {
        self.shuffle_enabled = enabled;
        if let Err(e) = self.preferences.set_shuffle_enabled(enabled) {
            log::warn!("failed to persist shuffle preference: {e}");
        }
        self.commands.dispatch(PlaybackCommand::SetShuffle(enabled));
    }

    /// While set, incoming events do not overwrite the local position.
    pub fn set_user_seeking(&mut self, seeking: bool) {
        self.user_seeking = seeking;
    }

    pub fn update_progress(&mut self) {
        self.advance_progress(Instant::now());
    }

    /// Advance the cached position by the wall-clock time since the last
    /// tick. Cosmetic; the next event overrides it.
    pub fn advance_progress(&mut self, now: Instant) {
        if self.is_playing && !self.user_seeking {
            let elapsed = now.saturating_duration_since(self.last_tick).as_millis() as u64;
            self.position_ms += elapsed;
            if self.duration_ms > 0 {
                self.position_ms = self.position_ms.min(self.duration_ms);
            }
        }
        self.last_tick = now;
    }

    /// Apply every pending event. Returns how many were applied.
    pub fn poll_events(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(frame) = self.events.try_recv() {
            self.reconcile(&frame);
            applied += 1;
        }
        applied
    }

    /// Block up to `timeout` for one event, then apply whatever else is
    /// pending. Returns false on timeout or when the engine is gone.
    pub fn wait_event(&mut self, timeout: Duration) -> bool {
        match self.events.recv_timeout(timeout) {
            Ok(frame) => {
                self.reconcile(&frame);
                self.poll_events();
                true
            }
            Err(RecvTimeoutError::Timeout) => false,
            Err(RecvTimeoutError::Disconnected) => {
                log::debug!("event channel closed");
                false
            }
        }
    }

    /// Replace engine-owned fields from `frame`.
    pub fn reconcile(&mut self, frame: &EventFrame) {
        self.is_playing = frame.playing;
        self.duration_ms = frame.duration_ms();

        match frame.track_id() {
            None => self.current_track = None,
            Some(id) => match self.queue.index_of(id) {
                Some(idx) => {
                    self.current_index = Some(idx);
                    self.current_track = self.queue.get(idx).cloned();
                }
                None if self.current_track.as_ref().is_some_and(|t| t.id == id) => {}
                None => {
                    log::debug!("engine reports track {id} which is not in the local queue");
                    self.current_track = None;
                }
            },
        }
        if self.queue.is_empty() {
            self.current_index = None;
        }

        if !self.user_seeking {
            self.position_ms = frame.position_ms();
        }
        self.last_tick = Instant::now();
    }

    /// Flush pending queue saves. The engine is shut down by its owner.
    pub fn shutdown(&mut self) {
        self.writer.close();
        self.preferences.close();
    }
}
