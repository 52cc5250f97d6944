//! Remote-control client for a camera car.
//!
//! carlink keeps three TCP channels open to the car:
//! - video: length-prefixed still frames, newest frame wins
//! - audio: microphone mixed with a looping background track, raw i16 PCM
//! - gamepad: quantized and deduplicated controller commands
//!
//! # Crate Structure
//!
//! - [`transport`]: channel streams, connect options and the stop signal
//! - [`video`]: frame demultiplexing
//! - [`audio`]: capture, tracks and mixing
//! - [`input`]: controller sources and command encoding
//! - [`client`]: runs the enabled pipelines, one thread each

/// Re-export transport types.
pub mod transport {
    pub use carlink_transport::*;
}

/// Re-export video types.
pub mod video {
    pub use carlink_video::*;
}

/// Re-export audio types.
pub mod audio {
    pub use carlink_audio::*;
}

/// Re-export input types.
pub mod input {
    pub use carlink_input::*;
}

pub mod client;
pub mod sink;

pub use client::{
    Client, ClientConfig, ClientError, Devices, FailureKind, Outcome, Pipeline, PipelineReport,
    DEFAULT_AUDIO_PORT, DEFAULT_GAMEPAD_PORT, DEFAULT_VIDEO_PORT, DEFAULT_VIEW_FPS,
};
pub use sink::{DiscardSink, FrameSink, SnapshotSink};
