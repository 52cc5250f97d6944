//! Video channel demultiplexing for carlink.
//!
//! The server streams compressed still images, each framed as:
//! - An `H`-byte big-endian payload length (`H` configurable, commonly 4)
//! - Exactly that many payload bytes
//!
//! [`FrameDemultiplexer`] is polled at the display cadence and always hands out
//! the newest complete frame; complete frames that were overtaken before the
//! next poll are dropped without being decoded.

pub mod codec;
pub mod decoder;
pub mod demux;
pub mod error;

pub use codec::{
    encode_frame, scan_frames, FrameSpan, ScanOutcome, VideoConfig, DEFAULT_MAX_FRAME_SIZE,
    DEFAULT_PREFIX_WIDTH,
};
pub use decoder::{DecodedImage, ImageDecoder, PayloadDecoder, RawRgbDecoder};
pub use demux::{DemuxStats, FrameDemultiplexer};
pub use error::{DecodeError, Result, VideoError};
