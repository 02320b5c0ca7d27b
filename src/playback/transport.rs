//! The media transport seen by the engine.
//!
//! A transport decodes and outputs one track at a time. Its lifecycle mirrors
//! a platform media player: `reset` -> `prepare` -> `start`/`pause`/`seek` ->
//! completion. Asynchronous notifications are queued and drained by the
//! engine through `poll_signal`; each carries the generation that was passed
//! to `prepare`, so the engine can drop callbacks from an older load.

use std::time::Duration;

use crate::error::TransportError;
use crate::library::Track;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TransportSignal {
    /// The load tagged with `generation` is ready to start.
    Prepared { generation: u64 },
    /// The load tagged with `generation` played to its end.
    Completed { generation: u64 },
}

pub trait Transport {
    /// Drop any loaded media and pending signals. Must be called before reuse.
    fn reset(&mut self);
    /// Begin loading `track`; readiness is reported as `Prepared { generation }`.
    fn prepare(&mut self, track: &Track, generation: u64) -> Result<(), TransportError>;
    fn start(&mut self) -> Result<(), TransportError>;
    fn pause(&mut self) -> Result<(), TransportError>;
    fn stop(&mut self) -> Result<(), TransportError>;
    fn seek(&mut self, position: Duration) -> Result<(), TransportError>;

    fn position(&self) -> Duration;
    /// Duration reported by the decoder, if it knows one.
    fn duration(&self) -> Option<Duration>;
    fn is_playing(&self) -> bool;

    /// Next pending notification, if any.
    fn poll_signal(&mut self) -> Option<TransportSignal>;

    /// Ramp the output down before a shutdown. Transports without volume
    /// control may ignore this.
    fn fade_out(&mut self, _fade_out: Duration) {}
}
