//! Error types shared across the crate.

use std::path::PathBuf;

use thiserror::Error;

/// Faults raised by a playback transport.
///
/// The engine never forwards these to the controller; they are logged and the
/// offending operation is dropped.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to open {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {path:?}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("audio output unavailable: {0}")]
    Output(String),

    #[error("seek failed: {0}")]
    Seek(String),

    #[error("no media is prepared")]
    NotPrepared,
}

/// Faults raised by the on-disk stores (session, favorites, preferences).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode store file: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("failed to decode store file: {0}")]
    Decode(#[from] toml::de::Error),
}
