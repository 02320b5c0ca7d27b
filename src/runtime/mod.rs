//! Headless runtime: load settings, open the stores, restore or rescan the
//! library, start the engine and drive the controller from stdin.

use std::env;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use crate::controller::PlaybackController;
use crate::library::LibraryCatalog;
use crate::playback::{PlaybackEngine, RodioTransport};

mod event_loop;
mod settings;
mod startup;

/// First positional argument, else the current directory, else `Music`.
fn library_dir() -> PathBuf {
    env::args()
        .skip(1)
        .find(|a| !a.starts_with('-'))
        .map(PathBuf::from)
        .or_else(|| env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("Music"))
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = settings::load_settings();
    let dir = library_dir();

    let stores = startup::open_stores(&settings.storage);
    let tracks = startup::load_library(
        stores.session.as_ref(),
        &dir,
        &settings.library,
        SystemTime::now(),
    );
    let catalog = LibraryCatalog::new(tracks);

    let (engine, events) = PlaybackEngine::spawn(RodioTransport::open, &settings.engine);
    let mut controller = PlaybackController::new(
        engine.commands(),
        events,
        stores.session.clone(),
        stores.preferences,
    );
    let mut favorites = stores.favorites;

    let result = event_loop::run(&settings, &catalog, &mut controller, favorites.as_mut());

    engine.quit_softly(Duration::from_millis(settings.audio.quit_fade_out_ms));
    controller.shutdown();
    result
}
