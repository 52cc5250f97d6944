use carlink::audio::AudioConfig;
use carlink::input::QuantizerConfig;
use carlink::video::VideoConfig;
use carlink::{DEFAULT_AUDIO_PORT, DEFAULT_GAMEPAD_PORT, DEFAULT_VIDEO_PORT, DEFAULT_VIEW_FPS};
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::OutputFormat;

/// Wire defaults this build speaks when no config file overrides them.
#[derive(Debug, Serialize)]
struct ChannelDefaults {
    video_port: u16,
    audio_port: u16,
    gamepad_port: u16,
    frame_prefix_bytes: usize,
    view_fps: u32,
    audio_format: String,
    gamepad_partitions: u32,
    gamepad_axis_max: i32,
}

#[derive(Debug, Serialize)]
struct VersionInfo {
    name: &'static str,
    version: &'static str,
    target: &'static str,
    profile: &'static str,
    features: Vec<&'static str>,
    defaults: ChannelDefaults,
}

impl VersionInfo {
    fn collect() -> Self {
        let audio = AudioConfig::default();
        let quantizer = QuantizerConfig::default();
        let mut features = vec!["cli"];
        if cfg!(feature = "device-cpal") {
            features.push("device-cpal");
        }
        if cfg!(target_os = "linux") {
            features.push("evdev");
        }

        Self {
            name: "carlink",
            version: env!("CARGO_PKG_VERSION"),
            target: option_env!("CARLINK_BUILD_TARGET").unwrap_or("unknown"),
            profile: option_env!("CARLINK_BUILD_PROFILE").unwrap_or("unknown"),
            features,
            defaults: ChannelDefaults {
                video_port: DEFAULT_VIDEO_PORT,
                audio_port: DEFAULT_AUDIO_PORT,
                gamepad_port: DEFAULT_GAMEPAD_PORT,
                frame_prefix_bytes: VideoConfig::default().prefix_width,
                view_fps: DEFAULT_VIEW_FPS,
                audio_format: format!(
                    "s16le {} Hz x{}, {} frames/chunk",
                    audio.sample_rate, audio.channels, audio.chunk_size
                ),
                gamepad_partitions: quantizer.partitions,
                gamepad_axis_max: quantizer.axis_max,
            },
        }
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        let defaults = &self.defaults;
        vec![
            ("version", self.version.to_string()),
            ("target", self.target.to_string()),
            ("profile", self.profile.to_string()),
            ("features", self.features.join(",")),
            (
                "ports",
                format!(
                    "video={} audio={} gamepad={}",
                    defaults.video_port, defaults.audio_port, defaults.gamepad_port
                ),
            ),
            ("frame_prefix_bytes", defaults.frame_prefix_bytes.to_string()),
            ("view_fps", defaults.view_fps.to_string()),
            ("audio_format", defaults.audio_format.clone()),
            (
                "gamepad_quantizer",
                format!(
                    "partitions={} axis_max={}",
                    defaults.gamepad_partitions, defaults.gamepad_axis_max
                ),
            ),
        ]
    }
}

pub fn run(args: VersionArgs, format: OutputFormat) -> CliResult<i32> {
    if !args.extended {
        println!("carlink {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    let info = VersionInfo::collect();
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&info).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["KEY", "VALUE"]);
            for (key, value) in info.fields() {
                table.add_row(vec![key.to_string(), value]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{} {}\n", info.name, info.version);
            for (key, value) in info.fields().into_iter().skip(1) {
                println!("  {key:<20} {value}");
            }
        }
        OutputFormat::Raw => {
            for (key, value) in info.fields() {
                println!("{key}={value}");
            }
        }
    }
    Ok(SUCCESS)
}
