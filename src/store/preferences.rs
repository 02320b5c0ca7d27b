use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

use super::writer::CoalescingWriter;
use super::{read_toml, write_toml};

/// User playback preferences the controller forwards to the engine.
pub trait PlaybackPreferences: Send {
    fn shuffle_enabled(&self) -> bool;
    fn set_shuffle_enabled(&mut self, enabled: bool) -> Result<(), StoreError>;

    /// Flush anything still being written.
    fn close(&mut self) {}
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
struct PreferencesFile {
    shuffle: bool,
}

/// Preferences kept in a TOML file. Changes take effect immediately and
/// are written on a background thread.
pub struct FilePreferences {
    prefs: PreferencesFile,
    writer: CoalescingWriter<PreferencesFile>,
}

impl FilePreferences {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let prefs = read_toml(&path)?;
        let writer = CoalescingWriter::spawn(move |prefs: PreferencesFile| {
            if let Err(e) = write_toml(&path, &prefs) {
                log::warn!("failed to save preferences to {}: {e}", path.display());
            }
        });
        Ok(Self { prefs, writer })
    }
}

impl PlaybackPreferences for FilePreferences {
    fn shuffle_enabled(&self) -> bool {
        self.prefs.shuffle
    }

    fn set_shuffle_enabled(&mut self, enabled: bool) -> Result<(), StoreError> {
        if self.prefs.shuffle == enabled {
            return Ok(());
        }
        self.prefs.shuffle = enabled;
        if !self.writer.submit(self.prefs.clone()) {
            log::warn!("preferences writer is closed, dropping save");
        }
        Ok(())
    }

    fn close(&mut self) {
        self.writer.close();
    }
}

#[derive(Debug, Default)]
pub struct MemoryPreferences {
    shuffle: bool,
}

impl MemoryPreferences {
    pub fn new(shuffle: bool) -> Self {
        Self { shuffle }
    }
}

impl PlaybackPreferences for MemoryPreferences {
    fn shuffle_enabled(&self) -> bool {
        self.shuffle
    }

    fn set_shuffle_enabled(&mut self, enabled: bool) -> Result<(), StoreError> {
        self.shuffle = enabled;
        Ok(())
    }
}
