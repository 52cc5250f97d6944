use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use carlink::audio::{list_tracks, AudioConfig, CaptureSource, PcmSource, SilentCapture, WavTrack};
use carlink::input::{ControllerSource, ReplaySource};
use carlink::transport::StopSignal;
use carlink::{Client, ClientConfig, Devices, DiscardSink, FrameSink, SnapshotSink};
use tracing::{info, warn};

use crate::cmd::{MicBackend, RunArgs};
use crate::config::FileConfig;
use crate::exit::{
    audio_error, client_error, input_error, io_error, reports_code, CliError, CliResult, INTERNAL,
    USAGE,
};
use crate::output::{print_reports, OutputFormat};

const SUPERVISE_TICK: Duration = Duration::from_millis(100);

pub fn run(args: RunArgs, format: OutputFormat, file: &FileConfig) -> CliResult<i32> {
    let host = file.resolve_host(args.host.clone())?;
    let mut config = file.client_config(host.clone());
    if let Some(fps) = args.fps {
        config.view_fps = fps;
    }

    let devices = open_devices(&args, file, &config)?;
    let client = Client::start(config, devices).map_err(|err| client_error("start failed", err))?;
    install_ctrlc_handler(client.stop_signal())?;

    supervise(&client, spawn_stdin_reader());

    client.stop();
    let reports = client.wait();
    print_reports(&host, &reports, format);
    Ok(reports_code(&reports))
}

fn open_devices(args: &RunArgs, file: &FileConfig, config: &ClientConfig) -> CliResult<Devices> {
    let mut devices = Devices::default();

    if !args.no_video {
        let sink: Box<dyn FrameSink> = match &args.snapshot {
            Some(path) => {
                let sink = SnapshotSink::new(path);
                info!(path = %sink.path().display(), "writing video snapshots");
                Box::new(sink)
            }
            None => Box::new(DiscardSink),
        };
        devices.frame_sink = Some(sink);
    }

    if !args.no_audio {
        devices.capture = Some(open_capture(args.mic, &config.audio)?);
        devices.track = open_initial_track(args, file, &config.audio)?;
    }

    if !args.no_gamepad {
        devices.controller = Some(open_controller(args, file)?);
    }

    if devices.frame_sink.is_none() && devices.capture.is_none() && devices.controller.is_none() {
        return Err(CliError::new(USAGE, "all channels disabled; nothing to run"));
    }
    Ok(devices)
}

fn open_capture(mic: MicBackend, audio: &AudioConfig) -> CliResult<Box<dyn CaptureSource>> {
    if mic == MicBackend::Silent {
        return Ok(Box::new(SilentCapture::new(audio.channels, audio.sample_rate)));
    }

    #[cfg(feature = "device-cpal")]
    {
        let capture = carlink::audio::CpalCapture::open_default(audio)
            .map_err(|err| audio_error("microphone unavailable", err))?;
        Ok(Box::new(capture))
    }

    #[cfg(not(feature = "device-cpal"))]
    {
        warn!("built without device-cpal; streaming a silent microphone");
        Ok(Box::new(SilentCapture::new(audio.channels, audio.sample_rate)))
    }
}

/// `--track`, else the first WAV of `--tracks-dir`, else the first WAV of
/// the configured directory or the working directory.
fn open_initial_track(
    args: &RunArgs,
    file: &FileConfig,
    audio: &AudioConfig,
) -> CliResult<Option<Box<dyn PcmSource>>> {
    if let Some(path) = args.track.as_ref().or(file.audio.track.as_ref()) {
        return open_track(path, audio).map(Some);
    }

    let (dir, explicit) = match args.tracks_dir.as_ref().or(file.audio.tracks_dir.as_ref()) {
        Some(dir) => (dir.clone(), true),
        None => (PathBuf::from("."), false),
    };
    let first = match list_tracks(&dir) {
        Ok(tracks) => tracks.into_iter().next(),
        Err(err) if explicit => return Err(audio_error(&format!("cannot list {}", dir.display()), err)),
        Err(err) => {
            warn!(dir = %dir.display(), error = %err, "cannot list tracks");
            None
        }
    };
    let Some(path) = first else {
        info!(dir = %dir.display(), "no background track found; starting with silence");
        return Ok(None);
    };

    match open_track(&path, audio) {
        Ok(track) => Ok(Some(track)),
        Err(err) if explicit => Err(err),
        Err(err) => {
            warn!(error = %err, "skipping background track");
            Ok(None)
        }
    }
}

fn open_track(path: &Path, audio: &AudioConfig) -> CliResult<Box<dyn PcmSource>> {
    let track = WavTrack::open(path, audio.channels, audio.sample_rate)
        .map_err(|err| audio_error(&format!("cannot use track {}", path.display()), err))?;
    info!(path = %path.display(), "initial background track");
    Ok(Box::new(track))
}

fn open_controller(args: &RunArgs, file: &FileConfig) -> CliResult<Box<dyn ControllerSource>> {
    if let Some(path) = &args.gamepad_replay {
        let script = std::fs::read_to_string(path)
            .map_err(|err| io_error(&format!("cannot read {}", path.display()), err))?;
        let source = ReplaySource::from_script(&script)
            .map_err(|err| input_error(&format!("cannot replay {}", path.display()), err))?;
        info!(path = %path.display(), events = source.remaining(), "replaying controller script");
        return Ok(Box::new(source));
    }

    let device = args.gamepad.as_ref().or(file.gamepad.device.as_ref());

    #[cfg(target_os = "linux")]
    {
        use carlink::input::EvdevSource;

        let source = match device {
            Some(path) => EvdevSource::open(path),
            None => EvdevSource::open_default(),
        }
        .map_err(|err| input_error("controller unavailable (try --no-gamepad)", err))?;
        info!(device = %source.path().display(), "controller opened");
        Ok(Box::new(source))
    }

    #[cfg(not(target_os = "linux"))]
    {
        let _ = device;
        Err(CliError::new(
            USAGE,
            "no controller backend on this platform; use --gamepad-replay or --no-gamepad",
        ))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum StdinCommand {
    Track(PathBuf),
    Gains { mic: f32, track: f32 },
    Quit,
}

fn parse_command(line: &str) -> Result<Option<StdinCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    match verb {
        "quit" | "exit" if rest.is_empty() => Ok(Some(StdinCommand::Quit)),
        "track" if !rest.is_empty() => Ok(Some(StdinCommand::Track(PathBuf::from(rest)))),
        "gains" => {
            let values: Vec<&str> = rest.split_whitespace().collect();
            let [mic, track] = values.as_slice() else {
                return Err("usage: gains <mic> <track>".to_string());
            };
            let parse = |text: &str| {
                text.parse::<f32>()
                    .ok()
                    .filter(|value| value.is_finite())
                    .ok_or_else(|| format!("invalid gain {text:?}"))
            };
            Ok(Some(StdinCommand::Gains {
                mic: parse(*mic)?,
                track: parse(*track)?,
            }))
        }
        _ => Err(format!(
            "unknown command {line:?} (expected: track <path>, gains <mic> <track>, quit)"
        )),
    }
}

fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name("carlink-stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
    if let Err(err) = spawned {
        warn!(error = %err, "stdin commands unavailable");
    }
    rx
}

/// Apply stdin commands until stopped or every pipeline has ended.
fn supervise(client: &Client, commands: Receiver<String>) {
    let stop = client.stop_signal();
    let mut stdin_open = true;

    while !stop.is_stopped() && !client.is_finished() {
        if !stdin_open {
            thread::sleep(SUPERVISE_TICK);
            continue;
        }
        match commands.recv_timeout(SUPERVISE_TICK) {
            Ok(line) => match parse_command(&line) {
                Ok(Some(command)) => apply(client, command),
                Ok(None) => {}
                Err(message) => warn!("{message}"),
            },
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => stdin_open = false,
        }
    }
}

fn apply(client: &Client, command: StdinCommand) {
    match command {
        StdinCommand::Quit => {
            info!("quit requested");
            client.stop();
        }
        StdinCommand::Track(path) => match client.mixer() {
            Some(mixer) => {
                if let Err(err) = mixer.select_track(&path) {
                    warn!(path = %path.display(), error = %err, "track not changed");
                }
            }
            None => warn!("audio is disabled; ignoring track command"),
        },
        StdinCommand::Gains { mic, track } => match client.mixer() {
            Some(mixer) => {
                mixer.set_gains(mic, track);
                info!(mic, track, "gains set");
            }
            None => warn!("audio is disabled; ignoring gains command"),
        },
    }
}

fn install_ctrlc_handler(stop: StopSignal) -> CliResult<()> {
    ctrlc::set_handler(move || stop.stop())
        .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
