//! TCP channel transport for carlink.
//!
//! Every carlink pipeline owns exactly one TCP connection. This crate provides:
//! - [`connect`] with bounded connect/read/write timeouts
//! - [`ChannelStream`], which shuts its socket down when dropped
//! - [`StopSignal`], the cooperative stop flag each pipeline checks per cycle
//! - [`send_all`], a write loop that tolerates timeouts until a stop is requested

pub mod error;
pub mod signal;
pub mod stream;
pub mod tcp;

pub use error::{Result, TransportError};
pub use signal::StopSignal;
pub use stream::{send_all, ChannelStream};
pub use tcp::{connect, ConnectOptions};
