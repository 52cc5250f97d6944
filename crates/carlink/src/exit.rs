use std::fmt;
use std::io;

use carlink::audio::AudioError;
use carlink::input::InputError;
use carlink::transport::TransportError;
use carlink::{ClientError, FailureKind, Outcome, PipelineReport};

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const HEALTH_CHECK_FAILED: i32 = 30;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused => TRANSPORT_ERROR,
        io::ErrorKind::NotFound => USAGE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Resolve { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        TransportError::Connect { .. } if err.io_kind() == Some(io::ErrorKind::TimedOut) => {
            CliError::new(TIMEOUT, format!("{context}: {err}"))
        }
        TransportError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn audio_error(context: &str, err: AudioError) -> CliError {
    match err {
        AudioError::Io(source) => io_error(context, source),
        AudioError::Transport(err) => transport_error(context, err),
        AudioError::Wav(_) | AudioError::TrackFormat { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        AudioError::InvalidConfig(_) => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(FAILURE, format!("{context}: {other}")),
    }
}

pub fn input_error(context: &str, err: InputError) -> CliError {
    match err {
        InputError::Io(source) => io_error(context, source),
        InputError::Transport(err) => transport_error(context, err),
        InputError::InvalidScript { .. } => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        other => CliError::new(FAILURE, format!("{context}: {other}")),
    }
}

pub fn client_error(context: &str, err: ClientError) -> CliError {
    match err {
        ClientError::Audio(err) => audio_error(context, err),
        ClientError::Video(_) | ClientError::NothingEnabled => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        ClientError::Spawn { .. } => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}

/// Exit code for a finished run: the most severe pipeline failure wins.
pub fn reports_code(reports: &[PipelineReport]) -> i32 {
    let worst = reports
        .iter()
        .filter_map(|report| match &report.outcome {
            Outcome::Failed { kind, .. } => Some(*kind),
            Outcome::Stopped => None,
        })
        .max();
    match worst {
        None => SUCCESS,
        Some(FailureKind::Device) => FAILURE,
        Some(FailureKind::Connect | FailureKind::Transport) => TRANSPORT_ERROR,
        Some(FailureKind::Protocol) => DATA_INVALID,
        Some(FailureKind::Internal) => INTERNAL,
    }
}
