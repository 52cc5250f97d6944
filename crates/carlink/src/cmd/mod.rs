use std::path::{Path, PathBuf};

use clap::{Args, Subcommand, ValueEnum};

use crate::config::FileConfig;
use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod doctor;
pub mod run;
pub mod tracks;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect to a car and stream video, audio and gamepad commands.
    Run(RunArgs),
    /// List background tracks and whether they can be mixed.
    Tracks(TracksArgs),
    /// Run local environment and connectivity checks.
    Doctor(DoctorArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat, config_path: Option<&Path>) -> CliResult<i32> {
    match command {
        Command::Run(args) => run::run(args, format, &FileConfig::load(config_path)?),
        Command::Tracks(args) => tracks::run(args, format, &FileConfig::load(config_path)?),
        Command::Doctor(args) => doctor::run(args, format, config_path),
        Command::Version(args) => version::run(args, format),
    }
}

/// Microphone backend for the audio pipeline.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum MicBackend {
    /// Default input device (silence when built without `device-cpal`).
    #[default]
    #[value(name = "default")]
    Device,
    /// Paced silence; only the background track is heard.
    #[value(name = "none")]
    Silent,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Car host name or address.
    #[arg(env = "CARLINK_HOST")]
    pub host: Option<String>,
    /// Initial background track (16-bit PCM WAV).
    #[arg(long, value_name = "PATH")]
    pub track: Option<PathBuf>,
    /// Directory whose first `*.wav` is the initial track.
    #[arg(long, value_name = "DIR", conflicts_with = "track")]
    pub tracks_dir: Option<PathBuf>,
    /// Keep the latest video frame in this file.
    #[arg(long, value_name = "PATH")]
    pub snapshot: Option<PathBuf>,
    /// Controller device (default: first /dev/input/by-id/*-event-joystick).
    #[arg(long, value_name = "DEVICE")]
    pub gamepad: Option<PathBuf>,
    /// Replay controller events from a script instead of a device.
    #[arg(long, value_name = "PATH", conflicts_with = "gamepad")]
    pub gamepad_replay: Option<PathBuf>,
    /// Microphone backend.
    #[arg(long, value_enum, default_value_t = MicBackend::Device)]
    pub mic: MicBackend,
    /// Do not open the video channel.
    #[arg(long)]
    pub no_video: bool,
    /// Do not open the audio channel.
    #[arg(long)]
    pub no_audio: bool,
    /// Do not open the gamepad channel.
    #[arg(long)]
    pub no_gamepad: bool,
    /// View ticks per second.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=240))]
    pub fps: Option<u32>,
}

#[derive(Args, Debug)]
pub struct TracksArgs {
    /// Directory to scan (default: configured tracks_dir, else the current directory).
    pub dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DoctorArgs {
    /// Also check that each channel port on this host accepts connections.
    pub host: Option<String>,
    /// Connect timeout per port (e.g. 2s, 500ms).
    #[arg(long, default_value = "2s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
