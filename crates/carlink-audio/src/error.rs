use std::path::PathBuf;

/// Errors that can occur in the audio pipeline.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    /// Connection or write failure on the audio channel.
    #[error("audio transport error: {0}")]
    Transport(#[from] carlink_transport::TransportError),

    /// An I/O error outside the socket (track files, directories).
    #[error("audio I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The WAV reader rejected a file.
    #[error("wav error: {0}")]
    Wav(#[from] hound::Error),

    /// A track exists but cannot be mixed with the configured stream format.
    #[error("unusable track {path}: {reason}")]
    TrackFormat { path: PathBuf, reason: String },

    /// The capture device failed or went away.
    #[error("capture device error: {0}")]
    Capture(String),

    /// The audio configuration is not usable.
    #[error("invalid audio config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, AudioError>;
