//! Playback engine, its transport, and the channel plumbing between the
//! engine and its controller.

mod engine;
mod player;
mod queue;
mod sink;
mod transport;
mod types;
pub mod wire;

pub use player::{CommandSender, PlaybackEngine};
pub use queue::Queue;
pub use sink::RodioTransport;
pub use transport::{Transport, TransportSignal};
pub use types::{EngineState, PlaybackCommand, PlaybackSnapshot};
