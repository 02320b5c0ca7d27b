//! Controller module: the UI-facing mirror of the playback engine.
//!
//! `PlaybackController` lives in `controller::model`. It keeps a display copy
//! of the queue, edits it optimistically, sends commands to the engine and
//! reconciles its cached playback state with the events that come back.

mod model;

pub use model::*;

#[cfg(test)]
mod tests;
