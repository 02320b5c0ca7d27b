//! encore: a local-media player core.
//!
//! A playback engine runs on its own thread and owns the audio transport.
//! It receives commands and publishes state snapshots over two one-way
//! channels. A [`controller::PlaybackController`] mirrors that state for
//! presentation code and applies optimistic queue edits.

pub mod config;
pub mod controller;
pub mod error;
pub mod library;
pub mod playback;
pub mod runtime;
pub mod store;
