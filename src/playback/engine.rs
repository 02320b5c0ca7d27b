//! The playback engine: sole owner of the transport and the authoritative
//! queue.
//!
//! The engine runs on its own thread, consumes command frames in send order
//! and publishes an event frame after every transition that changes the
//! playing flag, the loaded track or the position. Transport faults are
//! logged and the operation is dropped.

use std::ops::ControlFlow;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use rand::{Rng, thread_rng};

use crate::library::{Track, TrackId};

use super::queue::Queue;
use super::transport::{Transport, TransportSignal};
use super::types::{EngineState, PlaybackCommand, PlaybackSnapshot};
use super::wire::{CommandFrame, EventFrame};

pub(crate) struct Engine<T: Transport> {
    transport: T,
    queue: Queue,
    /// Queue position; `None` only when the queue is empty.
    current: Option<usize>,
    /// Track handed to the transport by the latest load.
    loaded: Option<Track>,
    state: EngineState,
    /// Bumped on every load and teardown; signals tagged otherwise are stale.
    generation: u64,
    shuffle: bool,
    /// Where to land once the pending load is ready, set by a seek after
    /// natural completion.
    cue: Option<Cue>,
    events: Sender<EventFrame>,
}

#[derive(Debug, Clone, Copy)]
struct Cue {
    at: Duration,
    resume: bool,
}

impl<T: Transport> Engine<T> {
    pub(crate) fn new(transport: T, events: Sender<EventFrame>) -> Self {
        Self {
            transport,
            queue: Queue::new(),
            current: None,
            loaded: None,
            state: EngineState::Idle,
            generation: 0,
            shuffle: false,
            cue: None,
            events,
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> EngineState {
        self.state
    }

    #[cfg(test)]
    pub(crate) fn current_index(&self) -> Option<usize> {
        self.current
    }

    #[cfg(test)]
    pub(crate) fn queue(&self) -> &Queue {
        &self.queue
    }

    #[cfg(test)]
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Apply one command, then drain whatever the transport reported.
    pub(crate) fn handle(&mut self, cmd: PlaybackCommand) -> ControlFlow<()> {
        log::debug!("engine <- {cmd:?}");
        match cmd {
            PlaybackCommand::SetQueue(tracks) => self.set_queue(tracks),
            PlaybackCommand::Append(tracks) => self.append(tracks),
            PlaybackCommand::PlayTrackById(id) => self.play_by_id(id),
            PlaybackCommand::Play => self.play(),
            PlaybackCommand::Pause => self.pause(),
            PlaybackCommand::Next => self.next(),
            PlaybackCommand::Prev => self.prev(),
            PlaybackCommand::Seek(ms) => self.seek(ms),
            PlaybackCommand::Stop => self.stop(),
            PlaybackCommand::RemoveById(id) => self.remove_by_id(id),
            PlaybackCommand::SetShuffle(enabled) => self.shuffle = enabled,
            PlaybackCommand::Quit { fade_out_ms } => {
                self.quit(Duration::from_millis(fade_out_ms));
                return ControlFlow::Break(());
            }
        }
        self.pump_transport();
        ControlFlow::Continue(())
    }

    pub(crate) fn pump_transport(&mut self) {
        while let Some(signal) = self.transport.poll_signal() {
            match signal {
                TransportSignal::Prepared { generation } => self.on_prepared(generation),
                TransportSignal::Completed { generation } => self.on_completed(generation),
            }
        }
    }

    pub(crate) fn snapshot(&self) -> PlaybackSnapshot {
        let Some(track) = self.loaded.as_ref() else {
            return PlaybackSnapshot::default();
        };
        let duration_ms = self
            .transport
            .duration()
            .map(|d| d.as_millis() as u64)
            .filter(|d| *d > 0)
            .unwrap_or_else(|| track.duration_ms());
        let mut position_ms = self.transport.position().as_millis() as u64;
        if duration_ms > 0 {
            position_ms = position_ms.min(duration_ms);
        }
        PlaybackSnapshot {
            is_playing: self.state == EngineState::Playing,
            current_track: Some(track.clone()),
            position_ms,
            duration_ms,
        }
    }

    fn emit(&self) {
        let snapshot = self.snapshot();
        log::debug!(
            "engine -> playing={} track={:?} pos={}ms",
            snapshot.is_playing,
            snapshot.current_track.as_ref().map(|t| t.id),
            snapshot.position_ms
        );
        // Best effort: a vanished controller is not the engine's problem.
        let _ = self.events.send(EventFrame::from(&snapshot));
    }

    /// Release the transport and invalidate every signal from the old load.
    fn teardown(&mut self) {
        self.transport.reset();
        self.generation += 1;
        self.loaded = None;
        self.cue = None;
        self.state = EngineState::Idle;
    }

    fn play_at(&mut self, index: usize) {
        let Some(track) = self.queue.get(index).cloned() else {
            return;
        };
        // A transport may only be prepared once per load.
        self.teardown();
        self.current = Some(index);

        match self.transport.prepare(&track, self.generation) {
            Ok(()) => {
                self.loaded = Some(track);
                self.state = EngineState::Preparing;
            }
            Err(e) => {
                log::warn!("failed to prepare {}: {e}", track.path.display());
                self.emit();
            }
        }
    }

    fn on_prepared(&mut self, generation: u64) {
        if generation != self.generation || self.state != EngineState::Preparing {
            log::debug!("ignoring stale prepared signal (gen {generation}, current {})", self.generation);
            return;
        }
        if let Some(cue) = self.cue.take() {
            if let Err(e) = self.transport.seek(cue.at) {
                log::warn!("failed to seek to {}ms: {e}", cue.at.as_millis());
            }
            if !cue.resume {
                self.state = EngineState::Paused;
                self.emit();
                return;
            }
        }
        match self.transport.start() {
            Ok(()) => self.state = EngineState::Playing,
            Err(e) => {
                log::warn!("failed to start playback: {e}");
                self.teardown();
            }
        }
        self.emit();
    }

    fn on_completed(&mut self, generation: u64) {
        if generation != self.generation || self.state != EngineState::Playing {
            log::debug!("ignoring stale completion signal (gen {generation}, current {})", self.generation);
            return;
        }
        self.state = EngineState::Completed;
        let next = self.current.map_or(0, |i| i + 1);
        if next < self.queue.len() {
            self.play_at(next);
        } else {
            self.emit();
        }
    }

    fn set_queue(&mut self, tracks: Vec<Track>) {
        self.queue.set_all(tracks);
        let primed = (!self.queue.is_empty()).then_some(0);

        match self.loaded.as_ref().map(|t| t.id) {
            Some(id) => match self.queue.index_of(id) {
                Some(idx) => self.current = Some(idx),
                None => {
                    self.teardown();
                    self.current = primed;
                    self.emit();
                }
            },
            None => {
                self.current = primed;
                if self.state == EngineState::Stopped {
                    self.state = EngineState::Idle;
                }
            }
        }
    }

    fn append(&mut self, tracks: Vec<Track>) {
        self.queue.append(tracks);
        if self.current.is_none() && !self.queue.is_empty() {
            self.current = Some(0);
        }
        if self.state == EngineState::Stopped {
            self.state = EngineState::Idle;
        }
    }

    fn play_by_id(&mut self, id: TrackId) {
        match self.queue.index_of(id) {
            Some(idx) => self.play_at(idx),
            None if !self.queue.is_empty() => {
                log::debug!("track {id} is not queued, playing the head of the queue");
                self.play_at(0);
            }
            None => log::debug!("track {id} is not queued and the queue is empty"),
        }
    }

    fn play(&mut self) {
        match self.state {
            EngineState::Paused => match self.transport.start() {
                Ok(()) => {
                    self.state = EngineState::Playing;
                    self.emit();
                }
                Err(e) => log::warn!("failed to resume playback: {e}"),
            },
            EngineState::Idle | EngineState::Completed | EngineState::Stopped => {
                if self.queue.is_empty() {
                    log::debug!("play ignored: queue is empty");
                    return;
                }
                let idx = self.current.filter(|i| *i < self.queue.len()).unwrap_or(0);
                self.play_at(idx);
            }
            EngineState::Preparing => {
                if let Some(cue) = self.cue.as_mut() {
                    cue.resume = true;
                }
            }
            EngineState::Playing => {}
        }
    }

    fn pause(&mut self) {
        if self.state != EngineState::Playing {
            log::debug!("pause ignored in state {:?}", self.state);
            return;
        }
        match self.transport.pause() {
            Ok(()) => {
                self.state = EngineState::Paused;
                self.emit();
            }
            Err(e) => log::warn!("failed to pause playback: {e}"),
        }
    }

    fn next(&mut self) {
        let len = self.queue.len();
        if len == 0 {
            return;
        }
        if self.shuffle && len > 1 {
            let idx = random_index_except(len, self.current);
            self.play_at(idx);
            return;
        }
        let next = self.current.map_or(0, |i| i + 1);
        if next < len {
            self.play_at(next);
        } else {
            log::debug!("next ignored: already at the end of the queue");
        }
    }

    /// Sequential in both shuffle modes.
    fn prev(&mut self) {
        match self.current {
            Some(cur) if cur > 0 && cur - 1 < self.queue.len() => self.play_at(cur - 1),
            _ => log::debug!("prev ignored: already at the start of the queue"),
        }
    }

    fn seek(&mut self, target_ms: u64) {
        if self.loaded.is_none()
            || matches!(
                self.state,
                EngineState::Idle | EngineState::Preparing | EngineState::Stopped
            )
        {
            log::debug!("seek ignored in state {:?}", self.state);
            return;
        }
        let duration_ms = self.snapshot().duration_ms;
        let target_ms = if duration_ms > 0 {
            target_ms.min(duration_ms)
        } else {
            target_ms
        };

        // The media played out; reload it and hold it paused at the target.
        if self.state == EngineState::Completed {
            if let Some(idx) = self.current {
                self.play_at(idx);
                if self.state == EngineState::Preparing {
                    self.cue = Some(Cue {
                        at: Duration::from_millis(target_ms),
                        resume: false,
                    });
                }
            }
            return;
        }

        let was_playing = self.state == EngineState::Playing;
        if let Err(e) = self.transport.seek(Duration::from_millis(target_ms)) {
            log::warn!("failed to seek to {target_ms}ms: {e}");
            return;
        }
        // Some transports pause while seeking; restore the previous sub-state.
        if was_playing && !self.transport.is_playing() {
            if let Err(e) = self.transport.start() {
                log::warn!("failed to resume after seek: {e}");
            }
        }
        self.emit();
    }

    fn remove_by_id(&mut self, id: TrackId) {
        let Some((idx, _)) = self.queue.remove_by_id(id) else {
            log::debug!("remove ignored: track {id} is not queued");
            return;
        };
        let was_loaded = self.loaded.as_ref().is_some_and(|t| t.id == id);

        if self.queue.is_empty() {
            self.teardown();
            self.current = None;
            self.emit();
            return;
        }

        let successor = idx.min(self.queue.len() - 1);
        if was_loaded {
            self.play_at(successor);
            return;
        }

        self.current = match (&self.loaded, self.current) {
            (Some(loaded), _) => self.queue.index_of(loaded.id),
            (None, Some(cur)) if idx < cur => Some(cur - 1),
            (None, Some(cur)) if idx == cur => Some(successor),
            (None, cur) => cur,
        };
        if self.current.is_some_and(|i| i >= self.queue.len()) {
            self.current = Some(successor);
        }
    }

    fn stop(&mut self) {
        if self.loaded.is_some() {
            if let Err(e) = self.transport.stop() {
                log::debug!("transport stop failed: {e}");
            }
        }
        self.teardown();
        self.queue.clear();
        self.current = None;
        self.state = EngineState::Stopped;
        self.emit();
    }

    fn quit(&mut self, fade_out: Duration) {
        if self.state == EngineState::Playing {
            self.transport.fade_out(fade_out);
        }
        if self.loaded.is_some() {
            if let Err(e) = self.transport.stop() {
                log::debug!("transport stop failed: {e}");
            }
        }
        self.teardown();
        self.state = EngineState::Stopped;
        self.emit();
    }
}

/// Uniform pick among `0..len`, excluding `current` when it is in range.
fn random_index_except(len: usize, current: Option<usize>) -> usize {
    let mut rng = thread_rng();
    match current {
        Some(cur) if cur < len && len > 1 => {
            let pick = rng.gen_range(0..len - 1);
            if pick >= cur { pick + 1 } else { pick }
        }
        _ => rng.gen_range(0..len),
    }
}

/// Engine thread body: serve commands, and poll the transport on every
/// `tick` while idle so completions are noticed.
pub(crate) fn run<T: Transport>(mut engine: Engine<T>, rx: Receiver<CommandFrame>, tick: Duration) {
    loop {
        match rx.recv_timeout(tick) {
            Ok(frame) => {
                let Some(cmd) = frame.decode() else {
                    log::warn!("dropping malformed command frame: {frame:?}");
                    continue;
                };
                if engine.handle(cmd).is_break() {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => engine.pump_transport(),
            Err(RecvTimeoutError::Disconnected) => {
                engine.quit(Duration::ZERO);
                break;
            }
        }
    }
    log::debug!("engine thread exiting");
}
