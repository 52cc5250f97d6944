//! Game controller sampling for carlink.
//!
//! [`InputEncoder`] turns a high-rate stream of controller events into a
//! throttled command stream of `"<code> <value>,"` tokens:
//! - axis values are quantized into `2 * P + 1` buckets and only sent when the
//!   bucket changes
//! - buttons are sent as-is
//! - the gain button also flips the shared microphone/track gains

pub mod command;
pub mod encoder;
pub mod error;
pub mod event;
pub mod quantize;
pub mod source;

#[cfg(target_os = "linux")]
pub mod evdev;

pub use command::ControlCommand;
pub use encoder::{EncoderConfig, EncoderReport, InputEncoder};
pub use error::{InputError, Result};
pub use event::{ControllerSample, EventCode, ALLOWED_CODES};
pub use quantize::{quantize, AxisDedup, QuantizerConfig};
pub use source::{ControllerSource, ReplaySource};

#[cfg(target_os = "linux")]
pub use evdev::EvdevSource;
