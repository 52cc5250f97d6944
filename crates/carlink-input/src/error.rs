/// Errors that end the input pipeline.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    /// Connection or write failure on the gamepad channel.
    #[error("gamepad transport error: {0}")]
    Transport(#[from] carlink_transport::TransportError),

    /// An I/O error on the controller device.
    #[error("controller I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No controller device could be found or opened.
    #[error("controller not found: {0}")]
    DeviceNotFound(String),

    /// The controller went away.
    #[error("controller disconnected: {0}")]
    Disconnected(String),

    /// A replay script line could not be parsed.
    #[error("invalid replay script at line {line}: {reason}")]
    InvalidScript { line: usize, reason: String },
}

pub type Result<T> = std::result::Result<T, InputError>;
