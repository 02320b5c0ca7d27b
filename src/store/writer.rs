use std::sync::Arc;
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

use crate::library::Track;

use super::session::SessionStore;

/// A dedicated thread that persists values handed to it. Values queued while
/// a write is in flight collapse into the latest one.
pub(crate) struct CoalescingWriter<T> {
    tx: Option<Sender<T>>,
    join: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> CoalescingWriter<T> {
    pub(crate) fn spawn(mut write: impl FnMut(T) + Send + 'static) -> Self {
        let (tx, rx) = mpsc::channel::<T>();

        let join = thread::spawn(move || {
            while let Ok(mut value) = rx.recv() {
                while let Ok(newer) = rx.try_recv() {
                    value = newer;
                }
                write(value);
            }
        });

        Self {
            tx: Some(tx),
            join: Some(join),
        }
    }

    /// Returns false once the writer is closed.
    pub(crate) fn submit(&self, value: T) -> bool {
        self.tx.as_ref().is_some_and(|tx| tx.send(value).is_ok())
    }

    /// Flush pending writes and stop the thread.
    pub(crate) fn close(&mut self) {
        self.tx.take();
        if let Some(h) = self.join.take() {
            let _ = h.join();
        }
    }
}

impl<T> Drop for CoalescingWriter<T> {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(h) = self.join.take() {
            let _ = h.join();
        }
    }
}

/// Background queue persistence. Only the latest queue pending at any
/// moment is written.
pub struct QueueWriter {
    inner: CoalescingWriter<Vec<Track>>,
}

impl QueueWriter {
    pub fn spawn(store: Arc<dyn SessionStore>) -> Self {
        let inner = CoalescingWriter::spawn(move |tracks: Vec<Track>| {
            match store.save_queue(&tracks) {
                Ok(()) => log::debug!("saved queue of {} tracks", tracks.len()),
                Err(e) => log::warn!("failed to save queue: {e}"),
            }
        });
        Self { inner }
    }

    pub fn save(&self, tracks: Vec<Track>) {
        if !self.inner.submit(tracks) {
            log::warn!("queue writer is closed, dropping save");
        }
    }

    /// Flush pending saves and stop the writer thread.
    pub fn close(&mut self) {
        self.inner.close();
    }
}
