//! Microphone and background-track mixing for carlink.
//!
//! [`AudioMixerPipeline`] reads one chunk from a live [`CaptureSource`] and one
//! from a looping [`PcmSource`] per cycle, mixes them under the gains held in a
//! [`SharedGainState`], and writes the mix to the audio channel as raw
//! little-endian i16 PCM. The capture read paces the loop.

pub mod capture;
pub mod error;
pub mod gain;
pub mod mix;
pub mod pipeline;
pub mod track;

#[cfg(feature = "device-cpal")]
pub use capture::CpalCapture;
pub use capture::{CaptureSource, SilentCapture};
pub use error::{AudioError, Result};
pub use gain::{Gains, SharedGainState};
pub use mix::{encode_le, mix_into, normalize};
pub use pipeline::{AudioConfig, AudioMixerPipeline, MixerHandle, MixerReport};
pub use track::{fill_looping, list_tracks, probe_track, MemoryTrack, PcmSource, TrackInfo, WavTrack};
