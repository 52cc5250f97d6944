use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavReader};
use tracing::{debug, trace, warn};

use crate::error::{AudioError, Result};

/// A rewindable source of interleaved i16 samples.
pub trait PcmSource: Send {
    /// Append up to `max` samples to `out`; returns how many were appended.
    /// Returns 0 only at end of source.
    fn read_samples(&mut self, max: usize, out: &mut Vec<i16>) -> Result<usize>;

    /// Seek back to the first sample.
    fn rewind(&mut self) -> Result<()>;

    /// Label for logs.
    fn name(&self) -> &str;
}

/// Fill `out` with exactly `len` samples, wrapping to the start of `source`
/// whenever it runs out so the loop point has no gap.
///
/// A source that produces nothing even right after a rewind is treated as
/// empty and the remainder is padded with silence.
pub fn fill_looping(source: &mut dyn PcmSource, len: usize, out: &mut Vec<i16>) -> Result<()> {
    out.clear();
    let mut rewound = false;

    while out.len() < len {
        let n = source.read_samples(len - out.len(), out)?;
        if n > 0 {
            rewound = false;
            continue;
        }
        if rewound {
            debug!(track = source.name(), "track is empty; padding with silence");
            break;
        }
        trace!(track = source.name(), "track wrapped");
        source.rewind()?;
        rewound = true;
    }

    out.resize(len, 0);
    Ok(())
}

/// A looping WAV file track (16-bit integer PCM).
pub struct WavTrack {
    reader: WavReader<BufReader<File>>,
    name: String,
}

impl WavTrack {
    /// Open `path` and check it can be mixed into a `channels`-channel stream
    /// at `sample_rate`.
    ///
    /// A sample rate mismatch is only logged (the track plays at the wrong
    /// speed); a channel count or sample format mismatch is rejected.
    pub fn open(path: impl AsRef<Path>, channels: u16, sample_rate: u32) -> Result<Self> {
        let path = path.as_ref();
        let reader = WavReader::open(path)?;
        let spec = reader.spec();

        if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != 16 {
            return Err(AudioError::TrackFormat {
                path: path.to_path_buf(),
                reason: format!(
                    "expected 16-bit integer PCM, found {}-bit {:?}",
                    spec.bits_per_sample, spec.sample_format
                ),
            });
        }
        if spec.channels != channels {
            return Err(AudioError::TrackFormat {
                path: path.to_path_buf(),
                reason: format!("expected {channels} channel(s), found {}", spec.channels),
            });
        }
        if spec.sample_rate != sample_rate {
            warn!(
                path = %path.display(),
                track_rate = spec.sample_rate,
                stream_rate = sample_rate,
                "track sample rate differs from stream rate"
            );
        }

        Ok(Self {
            reader,
            name: path.display().to_string(),
        })
    }

    /// Length in frames.
    pub fn duration_frames(&self) -> u32 {
        self.reader.duration()
    }
}

impl PcmSource for WavTrack {
    fn read_samples(&mut self, max: usize, out: &mut Vec<i16>) -> Result<usize> {
        let before = out.len();
        for sample in self.reader.samples::<i16>().take(max) {
            out.push(sample?);
        }
        Ok(out.len() - before)
    }

    fn rewind(&mut self) -> Result<()> {
        self.reader.seek(0)?;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// An in-memory looping track.
#[derive(Debug, Clone)]
pub struct MemoryTrack {
    samples: Vec<i16>,
    pos: usize,
    name: String,
}

impl MemoryTrack {
    pub fn new(name: impl Into<String>, samples: Vec<i16>) -> Self {
        Self {
            samples,
            pos: 0,
            name: name.into(),
        }
    }
}

impl PcmSource for MemoryTrack {
    fn read_samples(&mut self, max: usize, out: &mut Vec<i16>) -> Result<usize> {
        let end = (self.pos + max).min(self.samples.len());
        out.extend_from_slice(&self.samples[self.pos..end]);
        let n = end - self.pos;
        self.pos = end;
        Ok(n)
    }

    fn rewind(&mut self) -> Result<()> {
        self.pos = 0;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Format summary of a track file.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackInfo {
    pub path: PathBuf,
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub float: bool,
    pub duration_secs: f64,
}

impl TrackInfo {
    /// Whether [`WavTrack::open`] would accept this track for `channels`.
    pub fn is_mixable(&self, channels: u16) -> bool {
        !self.float && self.bits_per_sample == 16 && self.channels == channels
    }
}

/// Read the header of a WAV file.
pub fn probe_track(path: impl AsRef<Path>) -> Result<TrackInfo> {
    let path = path.as_ref();
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let duration_secs = if spec.sample_rate == 0 {
        0.0
    } else {
        f64::from(reader.duration()) / f64::from(spec.sample_rate)
    };
    Ok(TrackInfo {
        path: path.to_path_buf(),
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: spec.bits_per_sample,
        float: spec.sample_format == SampleFormat::Float,
        duration_secs,
    })
}

/// `*.wav` files directly inside `dir`, sorted by path.
pub fn list_tracks(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let mut tracks = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_wav = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"));
        if is_wav && path.is_file() {
            tracks.push(path);
        }
    }
    tracks.sort();
    Ok(tracks)
}
