//! `rodio`-backed transport.
//!
//! Each load builds a fresh paused `Sink` for the track. Completion is
//! detected by polling `Sink::empty` whenever the engine drains signals.

use std::collections::VecDeque;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::thread;
use std::time::Duration;

use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};

use crate::error::TransportError;
use crate::library::Track;

use super::transport::{Transport, TransportSignal};

pub struct RodioTransport {
    stream: OutputStream,
    sink: Option<Sink>,
    duration: Option<Duration>,
    generation: u64,
    completion_reported: bool,
    signals: VecDeque<TransportSignal>,
}

impl RodioTransport {
    /// Open the default output device. Must be called on the thread that will
    /// own the transport.
    pub fn open() -> Result<Self, TransportError> {
        let mut stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| TransportError::Output(e.to_string()))?;
        // rodio logs to stderr when OutputStream is dropped.
        stream.log_on_drop(false);

        Ok(Self {
            stream,
            sink: None,
            duration: None,
            generation: 0,
            completion_reported: false,
            signals: VecDeque::new(),
        })
    }

    fn sink(&self) -> Result<&Sink, TransportError> {
        self.sink.as_ref().ok_or(TransportError::NotPrepared)
    }
}

/// Create a paused `Sink` for `path`, returning the decoder's duration too.
fn create_sink(stream: &OutputStream, path: &Path) -> Result<(Sink, Option<Duration>), TransportError> {
    let file = File::open(path).map_err(|source| TransportError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let source = Decoder::new(BufReader::new(file)).map_err(|e| TransportError::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let duration = source.total_duration();

    let sink = Sink::connect_new(stream.mixer());
    sink.append(source);
    sink.pause();
    Ok((sink, duration))
}

impl Transport for RodioTransport {
    fn reset(&mut self) {
        if let Some(s) = self.sink.take() {
            s.stop();
        }
        self.duration = None;
        self.completion_reported = false;
        self.signals.clear();
    }

    fn prepare(&mut self, track: &Track, generation: u64) -> Result<(), TransportError> {
        let (sink, duration) = create_sink(&self.stream, &track.path)?;
        self.sink = Some(sink);
        self.duration = duration.or((!track.duration.is_zero()).then_some(track.duration));
        self.generation = generation;
        self.completion_reported = false;
        // Decoding is synchronous here, so the load is ready immediately.
        self.signals.push_back(TransportSignal::Prepared { generation });
        Ok(())
    }

    fn start(&mut self) -> Result<(), TransportError> {
        let sink = self.sink()?;
        sink.set_volume(1.0);
        sink.play();
        Ok(())
    }

    fn pause(&mut self) -> Result<(), TransportError> {
        self.sink()?.pause();
        Ok(())
    }

    fn stop(&mut self) -> Result<(), TransportError> {
        let sink = self.sink.take().ok_or(TransportError::NotPrepared)?;
        sink.stop();
        Ok(())
    }

    fn seek(&mut self, position: Duration) -> Result<(), TransportError> {
        self.sink()?
            .try_seek(position)
            .map_err(|e| TransportError::Seek(e.to_string()))
    }

    fn position(&self) -> Duration {
        self.sink.as_ref().map_or(Duration::ZERO, Sink::get_pos)
    }

    fn duration(&self) -> Option<Duration> {
        self.duration
    }

    fn is_playing(&self) -> bool {
        self.sink.as_ref().is_some_and(|s| !s.is_paused() && !s.empty())
    }

    fn poll_signal(&mut self) -> Option<TransportSignal> {
        if let Some(signal) = self.signals.pop_front() {
            return Some(signal);
        }
        let finished = self
            .sink
            .as_ref()
            .is_some_and(|s| !s.is_paused() && s.empty());
        if finished && !self.completion_reported {
            self.completion_reported = true;
            return Some(TransportSignal::Completed {
                generation: self.generation,
            });
        }
        None
    }

    fn fade_out(&mut self, fade_out: Duration) {
        let Some(sink) = self.sink.as_ref() else {
            return;
        };
        let fade_out_ms = fade_out.as_millis() as u64;
        if fade_out_ms == 0 {
            sink.set_volume(0.0);
            return;
        }
        let steps: u64 = 20;
        let step_ms = (fade_out_ms / steps).max(1);
        sink.set_volume(1.0);
        for step in 1..=steps {
            let t = step as f32 / steps as f32;
            sink.set_volume(1.0 - t);
            thread::sleep(Duration::from_millis(step_ms));
        }
        sink.set_volume(0.0);
    }
}
