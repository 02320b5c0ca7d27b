use std::sync::Mutex;
use std::sync::mpsc::{self, Receiver, SendError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::EngineSettings;
use crate::error::TransportError;

use super::engine::{self, Engine};
use super::transport::Transport;
use super::types::PlaybackCommand;
use super::wire::{CommandFrame, EventFrame};

/// Sending half of the command channel. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: Sender<CommandFrame>,
}

impl CommandSender {
    pub fn new(tx: Sender<CommandFrame>) -> Self {
        Self { tx }
    }

    pub fn send(&self, cmd: &PlaybackCommand) -> Result<(), SendError<CommandFrame>> {
        self.tx.send(CommandFrame::from(cmd))
    }

    /// Fire-and-forget send. A stopped engine is logged, not reported.
    pub fn dispatch(&self, cmd: PlaybackCommand) {
        if self.send(&cmd).is_err() {
            log::warn!("playback engine is gone, dropping {cmd:?}");
        }
    }
}

/// Owner of the engine thread.
pub struct PlaybackEngine {
    commands: CommandSender,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl PlaybackEngine {
    /// Spawn the engine thread. The transport is built on that thread by
    /// `make_transport`, since audio output handles are usually tied to the
    /// thread that opened them. Returns the handle and the event receiver.
    pub fn spawn<T, F>(make_transport: F, settings: &EngineSettings) -> (Self, Receiver<EventFrame>)
    where
        T: Transport + 'static,
        F: FnOnce() -> Result<T, TransportError> + Send + 'static,
    {
        let (cmd_tx, cmd_rx) = mpsc::channel::<CommandFrame>();
        let (event_tx, event_rx) = mpsc::channel::<EventFrame>();
        let tick = Duration::from_millis(settings.tick_ms.max(1));

        let join = thread::spawn(move || {
            let transport = match make_transport() {
                Ok(t) => t,
                Err(e) => {
                    log::error!("playback disabled: {e}");
                    return;
                }
            };
            engine::run(Engine::new(transport, event_tx), cmd_rx, tick);
        });

        let engine = Self {
            commands: CommandSender::new(cmd_tx),
            join: Mutex::new(Some(join)),
        };
        (engine, event_rx)
    }

    pub fn commands(&self) -> CommandSender {
        self.commands.clone()
    }

    pub fn send(&self, cmd: PlaybackCommand) -> Result<(), SendError<CommandFrame>> {
        self.commands.send(&cmd)
    }

    /// Ask the engine to fade out and exit, then wait for its thread.
    pub fn quit_softly(&self, fade_out: Duration) {
        let _ = self.send(PlaybackCommand::Quit {
            fade_out_ms: fade_out.as_millis() as u64,
        });

        if let Ok(mut j) = self.join.lock() {
            if let Some(h) = j.take() {
                let _ = h.join();
            }
        }
    }
}
