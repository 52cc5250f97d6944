use std::path::{Path, PathBuf};
use std::time::Duration;

use carlink::ClientConfig;
use carlink::video::VideoConfig;
use serde::Deserialize;

use crate::exit::{io_error, CliError, CliResult, DATA_INVALID, USAGE};

/// Optional JSON configuration file. Every field falls back to its default.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub host: Option<String>,
    pub connect: ConnectSection,
    pub video: VideoSection,
    pub audio: AudioSection,
    pub gamepad: GamepadSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConnectSection {
    pub timeout_ms: Option<u64>,
    pub nodelay: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VideoSection {
    pub port: Option<u16>,
    /// Length prefix width in bytes.
    pub header_size: Option<usize>,
    pub image_width: Option<u32>,
    pub image_height: Option<u32>,
    pub read_size: Option<usize>,
    pub max_frame_size: Option<usize>,
    pub max_buffer_size: Option<usize>,
    pub read_timeout_ms: Option<u64>,
    pub fps: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AudioSection {
    pub port: Option<u16>,
    pub rate: Option<u32>,
    pub channels: Option<u16>,
    /// Frames per chunk.
    pub chunk: Option<usize>,
    pub write_timeout_ms: Option<u64>,
    pub track: Option<PathBuf>,
    pub tracks_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GamepadSection {
    pub port: Option<u16>,
    pub partitions: Option<u32>,
    pub axis_max: Option<i32>,
    pub poll_timeout_ms: Option<u64>,
    pub write_timeout_ms: Option<u64>,
    pub device: Option<PathBuf>,
}

impl FileConfig {
    /// Load `path`, or the defaults when no file is given.
    pub fn load(path: Option<&Path>) -> CliResult<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .map_err(|err| io_error(&format!("failed to read config {}", path.display()), err))?;
        Self::parse(&text)
            .map_err(|err| CliError::new(DATA_INVALID, format!("invalid config {}: {}", path.display(), err.message)))
    }

    pub fn parse(text: &str) -> CliResult<Self> {
        let config: Self = serde_json::from_str(text)
            .map_err(|err| CliError::new(DATA_INVALID, err.to_string()))?;
        if config.gamepad.axis_max.is_some_and(|max| max <= 0) {
            return Err(CliError::new(DATA_INVALID, "gamepad.axis_max must be positive"));
        }
        if config.video.fps == Some(0) {
            return Err(CliError::new(DATA_INVALID, "video.fps must be positive"));
        }
        Ok(config)
    }

    /// Command line host first, then the file.
    pub fn resolve_host(&self, arg: Option<String>) -> CliResult<String> {
        arg.or_else(|| self.host.clone())
            .filter(|host| !host.trim().is_empty())
            .ok_or_else(|| {
                CliError::new(USAGE, "no host given (pass <HOST>, set CARLINK_HOST or \"host\" in the config)")
            })
    }

    pub fn client_config(&self, host: String) -> ClientConfig {
        let mut config = ClientConfig::new(host);

        if let Some(ms) = self.connect.timeout_ms {
            config.connect.connect_timeout = Duration::from_millis(ms);
        }
        if let Some(nodelay) = self.connect.nodelay {
            config.connect.nodelay = nodelay;
        }

        let video = &self.video;
        let defaults = VideoConfig::default();
        config.video = VideoConfig::for_frame_size(
            video.image_width.unwrap_or(defaults.frame_width),
            video.image_height.unwrap_or(defaults.frame_height),
        );
        if let Some(port) = video.port {
            config.video_port = port;
        }
        if let Some(width) = video.header_size {
            config.video.prefix_width = width;
        }
        if let Some(size) = video.read_size {
            config.video.read_size = size.max(1);
        }
        if let Some(size) = video.max_frame_size {
            config.video.max_frame_size = size;
        }
        if let Some(size) = video.max_buffer_size {
            config.video.max_buffer_size = size;
        }
        if let Some(ms) = video.read_timeout_ms {
            config.video.read_timeout = millis(ms);
        }
        if let Some(fps) = video.fps {
            config.view_fps = fps;
        }

        let audio = &self.audio;
        if let Some(port) = audio.port {
            config.audio_port = port;
        }
        if let Some(rate) = audio.rate {
            config.audio.sample_rate = rate;
        }
        if let Some(channels) = audio.channels {
            config.audio.channels = channels;
        }
        if let Some(chunk) = audio.chunk {
            config.audio.chunk_size = chunk;
        }
        if let Some(ms) = audio.write_timeout_ms {
            config.audio.write_timeout = millis(ms);
        }

        let gamepad = &self.gamepad;
        if let Some(port) = gamepad.port {
            config.gamepad_port = port;
        }
        if let Some(partitions) = gamepad.partitions {
            config.encoder.quantizer.partitions = partitions;
        }
        if let Some(axis_max) = gamepad.axis_max {
            config.encoder.quantizer.axis_max = axis_max;
        }
        if let Some(ms) = gamepad.poll_timeout_ms {
            config.encoder.poll_timeout = Duration::from_millis(ms.max(1));
        }
        if let Some(ms) = gamepad.write_timeout_ms {
            config.encoder.write_timeout = millis(ms);
        }

        config
    }
}

// Zero disables the timeout; a stop still closes the channel.
fn millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}
