/// Errors that end a video channel.
#[derive(Debug, thiserror::Error)]
pub enum VideoError {
    /// Connection setup or socket option failure.
    #[error("video transport error: {0}")]
    Transport(#[from] carlink_transport::TransportError),

    /// An I/O error occurred while reading the stream.
    #[error("video I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The server closed the connection.
    #[error("connection closed ({buffered} bytes of an incomplete frame pending)")]
    ConnectionClosed { buffered: usize },

    /// A frame header declared a payload above the configured maximum.
    #[error("declared frame length too large ({size} bytes, max {max})")]
    FrameTooLarge { size: u64, max: usize },

    /// The receive buffer grew past its bound without completing a frame.
    #[error("receive buffer overflow ({size} bytes, max {max})")]
    BufferOverflow { size: usize, max: usize },

    /// The configured length prefix width is outside 1..=8 bytes.
    #[error("invalid length prefix width {0} (expected 1..=8)")]
    InvalidPrefixWidth(usize),
}

/// Errors reported by an [`ImageDecoder`](crate::ImageDecoder).
///
/// A decode failure drops one frame; it never ends the channel.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("payload truncated (expected {expected} bytes, got {actual})")]
    Truncated { expected: usize, actual: usize },

    #[error("invalid image payload: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, VideoError>;
