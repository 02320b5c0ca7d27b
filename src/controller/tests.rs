use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use super::*;
use crate::config::EngineSettings;
use crate::library::{Track, TrackId};
use crate::playback::tests::{FakeTransport, track, tracks};
use crate::playback::wire::{CommandFrame, EventFrame, NO_TRACK};
use crate::playback::{CommandSender, PlaybackCommand, PlaybackEngine};
use crate::store::{FilePreferences, MemoryPreferences, MemorySessionStore, PlaybackPreferences, SessionStore};

struct Harness {
    ctl: PlaybackController,
    sent: Receiver<CommandFrame>,
    events: Sender<EventFrame>,
    session: Arc<MemorySessionStore>,
}

impl Harness {
    fn new(saved: Vec<Track>, shuffle: bool) -> Self {
        let session = Arc::new(MemorySessionStore::new());
        session.save_queue(&saved).unwrap();
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let ctl = PlaybackController::new(
            CommandSender::new(cmd_tx),
            event_rx,
            session.clone(),
            Box::new(MemoryPreferences::new(shuffle)),
        );
        Self {
            ctl,
            sent: cmd_rx,
            events: event_tx,
            session,
        }
    }

    fn sent(&self) -> Vec<PlaybackCommand> {
        self.sent.try_iter().filter_map(|f| f.decode()).collect()
    }

    fn push(&self, frame: EventFrame) {
        self.events.send(frame).unwrap();
    }
}

fn frame(playing: bool, id: Option<u64>, position_ms: i64, duration_ms: i64) -> EventFrame {
    EventFrame {
        playing,
        track_id: id.map_or(NO_TRACK, |i| i as i64),
        position_ms,
        duration_ms,
    }
}

fn ids(list: &[Track]) -> Vec<u64> {
    list.iter().map(|t| t.id.get()).collect()
}

#[test]
fn construction_restores_queue_and_shuffle_without_playing() {
    let h = Harness::new(tracks(&[1, 2, 3]), true);

    assert_eq!(ids(h.ctl.queue()), vec![1, 2, 3]);
    assert_eq!(h.ctl.current_index(), Some(0));
    assert!(h.ctl.shuffle_enabled());
    assert!(!h.ctl.is_playing());
    assert_eq!(
        h.sent(),
        vec![
            PlaybackCommand::SetShuffle(true),
            PlaybackCommand::SetQueue(tracks(&[1, 2, 3])),
        ]
    );
}

#[test]
fn construction_with_empty_store_sends_only_shuffle() {
    let h = Harness::new(Vec::new(), false);
    assert_eq!(h.sent(), vec![PlaybackCommand::SetShuffle(false)]);
    assert_eq!(h.ctl.current_index(), None);
}

#[test]
fn set_queue_dedups_bumps_version_and_persists() {
    let mut h = Harness::new(Vec::new(), false);
    h.sent();

    h.ctl.set_queue(tracks(&[4, 5, 4, 6]));
    assert_eq!(ids(h.ctl.queue()), vec![4, 5, 6]);
    assert_eq!(h.ctl.queue_version(), 1);
    assert_eq!(h.sent(), vec![PlaybackCommand::SetQueue(tracks(&[4, 5, 6]))]);

    h.ctl.shutdown();
    assert_eq!(ids(&h.session.load_queue().unwrap()), vec![4, 5, 6]);
}

#[test]
fn add_tracks_appends_only_new_ids() {
    let mut h = Harness::new(tracks(&[1, 2]), false);
    h.sent();

    h.ctl.add_tracks(tracks(&[2, 3, 3, 4]));
    assert_eq!(ids(h.ctl.queue()), vec![1, 2, 3, 4]);
    assert_eq!(h.sent(), vec![PlaybackCommand::Append(tracks(&[3, 4]))]);
    let version = h.ctl.queue_version();

    h.ctl.add_track(track(1));
    assert_eq!(h.ctl.queue_version(), version);
    assert!(h.sent().is_empty());
    assert!(h.ctl.is_queued(TrackId::new(4)));
}

#[test]
fn play_by_id_sets_the_track_optimistically() {
    let mut h = Harness::new(tracks(&[1, 2, 3]), false);
    h.sent();

    h.ctl.play_by_id(TrackId::new(2));
    assert_eq!(h.ctl.current_index(), Some(1));
    assert_eq!(h.ctl.current_track().map(|t| t.id.get()), Some(2));
    assert_eq!(h.ctl.duration_ms(), 200_000);
    assert_eq!(h.sent(), vec![PlaybackCommand::PlayTrackById(TrackId::new(2))]);
}

#[test]
fn removing_the_current_track_shows_its_successor() {
    let mut h = Harness::new(tracks(&[1, 2, 3]), false);
    h.ctl.play_by_id(TrackId::new(3));
    h.sent();

    h.ctl.remove_by_id(TrackId::new(3));
    assert_eq!(ids(h.ctl.queue()), vec![1, 2]);
    assert_eq!(h.ctl.current_index(), Some(1));
    assert_eq!(h.ctl.current_track().map(|t| t.id.get()), Some(2));
    assert_eq!(h.sent(), vec![PlaybackCommand::RemoveById(TrackId::new(3))]);
}

#[test]
fn removing_the_last_entry_clears_now_playing() {
    let mut h = Harness::new(tracks(&[1]), false);
    h.ctl.play_by_id(TrackId::new(1));
    h.push(frame(true, Some(1), 500, 200_000));
    h.ctl.poll_events();

    h.ctl.remove_by_id(TrackId::new(1));
    assert!(h.ctl.queue().is_empty());
    assert_eq!(h.ctl.current_index(), None);
    assert!(h.ctl.current_track().is_none());
    assert!(!h.ctl.is_playing());
    assert_eq!(h.ctl.progress(), 0.0);
}

#[test]
fn removing_an_unknown_id_changes_nothing() {
    let mut h = Harness::new(tracks(&[1, 2]), false);
    h.sent();
    h.ctl.remove_by_id(TrackId::new(9));
    assert_eq!(h.ctl.queue_version(), 0);
    assert!(h.sent().is_empty());
}

#[test]
fn play_track_moves_it_to_the_head() {
    let mut h = Harness::new(tracks(&[1, 2, 3]), false);
    h.sent();

    h.ctl.play_track(track(3));
    assert_eq!(ids(h.ctl.queue()), vec![3, 1, 2]);
    assert_eq!(
        h.sent(),
        vec![
            PlaybackCommand::SetQueue(tracks(&[3, 1, 2])),
            PlaybackCommand::PlayTrackById(TrackId::new(3)),
        ]
    );

    h.ctl.play_track(track(7));
    assert_eq!(ids(h.ctl.queue()), vec![7, 3, 1, 2]);
    assert_eq!(h.ctl.current_index(), Some(0));
}

#[test]
fn play_if_queued_keeps_the_order() {
    let mut h = Harness::new(tracks(&[1, 2, 3]), false);
    h.sent();

    h.ctl.play_if_queued(track(2));
    assert_eq!(ids(h.ctl.queue()), vec![1, 2, 3]);
    assert_eq!(h.sent(), vec![PlaybackCommand::PlayTrackById(TrackId::new(2))]);

    h.ctl.play_if_queued(track(8));
    assert_eq!(ids(h.ctl.queue()), vec![8, 1, 2, 3]);
}

#[test]
fn reconcile_replaces_engine_owned_fields() {
    let mut h = Harness::new(tracks(&[1, 2, 3]), false);
    h.ctl.play_by_id(TrackId::new(1));

    h.push(frame(true, Some(3), 1_234, 90_000));
    assert_eq!(h.ctl.poll_events(), 1);
    assert!(h.ctl.is_playing());
    assert_eq!(h.ctl.current_index(), Some(2));
    assert_eq!(h.ctl.current_track().map(|t| t.id.get()), Some(3));
    assert_eq!(h.ctl.position_ms(), 1_234);
    assert_eq!(h.ctl.duration_ms(), 90_000);

    h.push(frame(false, None, 0, 0));
    h.ctl.poll_events();
    assert!(!h.ctl.is_playing());
    assert!(h.ctl.current_track().is_none());
}

#[test]
fn latest_event_wins() {
    let mut h = Harness::new(tracks(&[1, 2]), false);
    h.push(frame(true, Some(1), 100, 200_000));
    h.push(frame(false, Some(2), 0, 200_000));
    assert_eq!(h.ctl.poll_events(), 2);
    assert!(!h.ctl.is_playing());
    assert_eq!(h.ctl.current_track().map(|t| t.id.get()), Some(2));
}

#[test]
fn user_seeking_keeps_the_local_position() {
    let mut h = Harness::new(tracks(&[1]), false);
    h.ctl.play_by_id(TrackId::new(1));
    h.push(frame(true, Some(1), 1_000, 200_000));
    h.ctl.poll_events();

    h.ctl.set_user_seeking(true);
    h.ctl.seek_to_fraction(0.5);
    assert_eq!(h.ctl.position_ms(), 100_000);

    h.push(frame(true, Some(1), 2_000, 200_000));
    h.ctl.poll_events();
    assert_eq!(h.ctl.position_ms(), 100_000);
    assert!(h.ctl.is_playing());

    h.ctl.set_user_seeking(false);
    h.push(frame(true, Some(1), 100_050, 200_000));
    h.ctl.poll_events();
    assert_eq!(h.ctl.position_ms(), 100_050);
}

#[test]
fn unknown_track_in_event_clears_the_current_track() {
    let mut h = Harness::new(tracks(&[1, 2]), false);
    h.push(frame(true, Some(42), 0, 1_000));
    h.ctl.poll_events();
    assert!(h.ctl.current_track().is_none());
    assert!(h.ctl.is_playing());
}

#[test]
fn progress_interpolates_only_while_playing() {
    let mut h = Harness::new(tracks(&[1]), false);
    h.push(frame(true, Some(1), 10_000, 200_000));
    h.ctl.poll_events();

    h.ctl.advance_progress(Instant::now() + Duration::from_millis(1_500));
    let pos = h.ctl.position_ms();
    assert!((11_500..12_500).contains(&pos), "position was {pos}");

    h.push(frame(false, Some(1), 20_000, 200_000));
    h.ctl.poll_events();
    h.ctl.advance_progress(Instant::now() + Duration::from_secs(5));
    assert_eq!(h.ctl.position_ms(), 20_000);
    assert!((h.ctl.progress() - 0.1).abs() < 1e-6);
}

#[test]
fn interpolation_is_clamped_to_the_duration() {
    let mut h = Harness::new(tracks(&[1]), false);
    h.push(frame(true, Some(1), 199_900, 200_000));
    h.ctl.poll_events();
    h.ctl.advance_progress(Instant::now() + Duration::from_secs(10));
    assert_eq!(h.ctl.position_ms(), 200_000);
    assert_eq!(h.ctl.progress(), 1.0);
}

#[test]
fn seek_to_fraction_needs_a_duration() {
    let mut h = Harness::new(tracks(&[1]), false);
    h.sent();
    h.ctl.seek_to_fraction(0.5);
    assert!(h.sent().is_empty());

    h.push(frame(true, Some(1), 0, 60_000));
    h.ctl.poll_events();
    h.ctl.seek_to_fraction(0.25);
    assert_eq!(h.sent(), vec![PlaybackCommand::Seek(15_000)]);
}

#[test]
fn seek_without_a_loaded_track_leaves_the_position_alone() {
    let mut h = Harness::new(tracks(&[1]), false);
    h.sent();
    h.ctl.seek(30_000);
    assert_eq!(h.ctl.position_ms(), 0);
    assert!(h.sent().is_empty());

    h.push(frame(false, Some(1), 0, 60_000));
    h.ctl.poll_events();
    h.ctl.seek(30_000);
    assert_eq!(h.ctl.position_ms(), 30_000);
    assert_eq!(h.sent(), vec![PlaybackCommand::Seek(30_000)]);
}

#[test]
fn toggle_play_pause_picks_the_right_command() {
    let mut h = Harness::new(tracks(&[1, 2]), false);
    h.sent();

    h.ctl.toggle_play_pause();
    assert_eq!(h.sent(), vec![PlaybackCommand::PlayTrackById(TrackId::new(1))]);

    h.push(frame(true, Some(1), 0, 200_000));
    h.ctl.poll_events();
    h.ctl.toggle_play_pause();
    assert_eq!(h.sent(), vec![PlaybackCommand::Pause]);

    h.push(frame(false, Some(1), 10, 200_000));
    h.ctl.poll_events();
    h.ctl.toggle_play_pause();
    assert_eq!(h.sent(), vec![PlaybackCommand::Play]);
}

#[test]
fn stop_clears_the_local_queue_too() {
    let mut h = Harness::new(tracks(&[1, 2]), false);
    h.ctl.play_by_id(TrackId::new(2));
    h.sent();

    h.ctl.clear_queue();
    assert!(h.ctl.queue().is_empty());
    assert!(h.ctl.current_track().is_none());
    assert_eq!(h.sent(), vec![PlaybackCommand::Stop]);

    h.ctl.shutdown();
    assert!(h.session.load_queue().unwrap().is_empty());
}

#[test]
fn shuffle_queue_keeps_the_current_track() {
    let mut h = Harness::new(tracks(&(1..=12).collect::<Vec<_>>()), false);
    h.ctl.play_by_id(TrackId::new(5));
    h.sent();

    h.ctl.shuffle_queue();
    let idx = h.ctl.current_index().unwrap();
    assert_eq!(h.ctl.queue()[idx].id, TrackId::new(5));
    assert!(!h.ctl.shuffle_enabled());

    let sent = h.sent();
    assert_eq!(sent.len(), 1);
    assert!(matches!(&sent[0], PlaybackCommand::SetQueue(q) if q.len() == 12));
}

#[test]
fn shuffle_mode_is_persisted_and_forwarded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("preferences.toml");
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let (_event_tx, event_rx) = mpsc::channel();

    let mut ctl = PlaybackController::new(
        CommandSender::new(cmd_tx),
        event_rx,
        Arc::new(MemorySessionStore::new()),
        Box::new(FilePreferences::open(&path).unwrap()),
    );
    ctl.set_shuffle_mode(true);
    assert!(ctl.shuffle_enabled());

    // The write happens off the controller thread; shutdown flushes it.
    ctl.shutdown();
    assert!(FilePreferences::open(&path).unwrap().shuffle_enabled());
    let sent: Vec<_> = cmd_rx.try_iter().filter_map(|f| f.decode()).collect();
    assert_eq!(sent.last(), Some(&PlaybackCommand::SetShuffle(true)));
}

#[test]
fn controller_and_engine_converge() {
    let fake = FakeTransport::new();
    let handle = fake.clone();
    let (engine, events) = PlaybackEngine::spawn(move || Ok(handle), &EngineSettings { tick_ms: 10 });

    let session = Arc::new(MemorySessionStore::new());
    let mut ctl = PlaybackController::new(
        engine.commands(),
        events,
        session.clone(),
        Box::new(MemoryPreferences::default()),
    );

    ctl.set_queue(tracks(&[1, 2, 3]));
    ctl.play_by_id(TrackId::new(2));
    assert!(ctl.wait_event(Duration::from_secs(2)));
    assert!(ctl.is_playing());
    assert_eq!(ctl.current_track().map(|t| t.id.get()), Some(2));

    ctl.next();
    assert!(ctl.wait_event(Duration::from_secs(2)));
    assert_eq!(ctl.current_index(), Some(2));

    // Next at the end changes nothing on either side.
    ctl.next();
    assert!(!ctl.wait_event(Duration::from_millis(100)));
    assert_eq!(ctl.current_track().map(|t| t.id.get()), Some(3));

    ctl.remove_by_id(TrackId::new(3));
    assert!(ctl.wait_event(Duration::from_secs(2)));
    assert_eq!(ctl.current_track().map(|t| t.id.get()), Some(2));
    assert!(ctl.is_playing());

    engine.quit_softly(Duration::ZERO);
    ctl.shutdown();
    assert_eq!(ids(&session.load_queue().unwrap()), vec![1, 2]);
}
