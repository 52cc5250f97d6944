use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use carlink_transport::{send_all, ChannelStream, StopSignal, TransportError};
use tracing::{debug, error, info};

use crate::capture::CaptureSource;
use crate::error::{AudioError, Result};
use crate::gain::{Gains, SharedGainState};
use crate::mix::{encode_le, mix_into, normalize};
use crate::track::{fill_looping, PcmSource, WavTrack};

/// Stream format of the audio channel.
#[derive(Debug, Clone)]
pub struct AudioConfig {
    /// Samples per second per channel. Default: 44100.
    pub sample_rate: u32,
    /// Interleaved channel count. Default: 1.
    pub channels: u16,
    /// Frames per mix cycle. Default: 1024.
    pub chunk_size: usize,
    /// Socket write timeout; bounds how long a stop can be delayed by a stalled peer.
    pub write_timeout: Option<Duration>,
}

impl AudioConfig {
    /// Samples in one mixed chunk (`channels * chunk_size`).
    pub fn samples_per_chunk(&self) -> usize {
        usize::from(self.channels) * self.chunk_size
    }

    /// Wall-clock length of one chunk.
    pub fn chunk_duration(&self) -> Duration {
        Duration::from_secs_f64(self.chunk_size as f64 / f64::from(self.sample_rate.max(1)))
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(AudioError::InvalidConfig("sample rate must be non-zero".to_string()));
        }
        if self.channels == 0 {
            return Err(AudioError::InvalidConfig("channel count must be non-zero".to_string()));
        }
        if self.chunk_size == 0 {
            return Err(AudioError::InvalidConfig("chunk size must be non-zero".to_string()));
        }
        Ok(())
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 1,
            chunk_size: 1024,
            write_timeout: Some(Duration::from_millis(200)),
        }
    }
}

type TrackSlot = Arc<Mutex<Option<Box<dyn PcmSource>>>>;

fn lock_slot(slot: &TrackSlot) -> MutexGuard<'_, Option<Box<dyn PcmSource>>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// What a mixer run accomplished before it stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MixerReport {
    pub chunks_sent: u64,
}

/// Cloneable control surface of a running mixer.
#[derive(Clone)]
pub struct MixerHandle {
    gains: Arc<SharedGainState>,
    pending: TrackSlot,
    config: AudioConfig,
}

impl MixerHandle {
    /// Open `path` as the new background track.
    ///
    /// The file is opened and validated here, on the caller's thread. The mixer
    /// switches to it at its next chunk boundary and releases the previous
    /// track. On error the current track keeps playing.
    pub fn select_track(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let track = WavTrack::open(path, self.config.channels, self.config.sample_rate)?;
        info!(path = %path.display(), "background track selected");
        self.replace_track(Box::new(track));
        Ok(())
    }

    /// Queue any PCM source as the next background track.
    pub fn replace_track(&self, source: Box<dyn PcmSource>) {
        *lock_slot(&self.pending) = Some(source);
    }

    pub fn set_gains(&self, mic: f32, track: f32) {
        self.gains.set_pair(mic, track);
    }

    pub fn gains(&self) -> Gains {
        self.gains.snapshot()
    }
}

/// Mixes live capture with a looping background track and streams the result.
pub struct AudioMixerPipeline {
    config: AudioConfig,
    gains: Arc<SharedGainState>,
    pending: TrackSlot,
}

impl AudioMixerPipeline {
    pub fn new(config: AudioConfig, gains: Arc<SharedGainState>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            gains,
            pending: Arc::new(Mutex::new(None)),
        })
    }

    pub fn handle(&self) -> MixerHandle {
        MixerHandle {
            gains: Arc::clone(&self.gains),
            pending: Arc::clone(&self.pending),
            config: self.config.clone(),
        }
    }

    /// Apply the configured write timeout to a connected audio channel.
    pub fn prepare_channel(&self, channel: &ChannelStream) -> Result<()> {
        channel.set_write_timeout(self.config.write_timeout)?;
        Ok(())
    }

    /// Run mix cycles until `stop` is raised or a fatal error occurs.
    ///
    /// Capture and write failures end the run. A background track that fails
    /// mid-read is dropped and replaced by silence; the microphone keeps
    /// streaming.
    pub fn run<C, W>(&self, capture: &mut C, out: &mut W, stop: &StopSignal) -> Result<MixerReport>
    where
        C: CaptureSource + ?Sized,
        W: Write,
    {
        let samples = self.config.samples_per_chunk();
        let mut track: Option<Box<dyn PcmSource>> = None;
        let mut mic = Vec::with_capacity(samples);
        let mut background = Vec::with_capacity(samples);
        let mut mixed = Vec::with_capacity(samples);
        let mut bytes = Vec::with_capacity(samples * 2);
        let mut report = MixerReport::default();

        info!(
            sample_rate = self.config.sample_rate,
            channels = self.config.channels,
            chunk_size = self.config.chunk_size,
            chunk_ms = self.config.chunk_duration().as_millis() as u64,
            "audio mixer started"
        );

        while !stop.is_stopped() {
            if let Some(next) = lock_slot(&self.pending).take() {
                debug!(track = next.name(), "switching background track");
                track = Some(next);
            }

            capture.read_chunk(self.config.chunk_size, &mut mic)?;
            normalize(&mut mic, samples);

            let filled = match track.as_mut() {
                Some(source) => match fill_looping(source.as_mut(), samples, &mut background) {
                    Ok(()) => true,
                    Err(err) => {
                        error!(track = source.name(), error = %err, "background track failed; continuing with silence");
                        false
                    }
                },
                None => false,
            };
            if !filled {
                track = None;
                background.clear();
                background.resize(samples, 0);
            }

            mix_into(&mic, &background, self.gains.snapshot(), &mut mixed);
            encode_le(&mixed, &mut bytes);

            match send_all(out, &bytes, stop) {
                Ok(()) => report.chunks_sent += 1,
                Err(TransportError::Shutdown) => break,
                Err(err) => return Err(err.into()),
            }
        }

        info!(chunks = report.chunks_sent, "audio mixer stopped");
        Ok(report)
    }
}
