use std::path::{Path, PathBuf};
use std::time::Duration;

use carlink::audio::{list_tracks, probe_track};
use carlink::transport::{connect, ConnectOptions};
use carlink::ClientConfig;
use serde::Serialize;

use crate::cmd::DoctorArgs;
use crate::config::FileConfig;
use crate::exit::{CliError, CliResult, HEALTH_CHECK_FAILED, SUCCESS, USAGE};
use crate::output::OutputFormat;

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Pass,
    Fail,
    Warn,
    Info,
    Skip,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    name: String,
    status: CheckStatus,
    detail: String,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DoctorOutput {
    checks: Vec<CheckResult>,
    overall: &'static str,
}

pub fn run(args: DoctorArgs, format: OutputFormat, config_path: Option<&Path>) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let mut checks = Vec::new();

    let file = match FileConfig::load(config_path) {
        Ok(file) => {
            checks.push(CheckResult::new(
                "config",
                CheckStatus::Pass,
                match config_path {
                    Some(path) => format!("{} loaded", path.display()),
                    None => "no config file; using defaults".to_string(),
                },
            ));
            file
        }
        Err(err) => {
            checks.push(CheckResult::new("config", CheckStatus::Fail, err.message));
            FileConfig::default()
        }
    };
    let host = args.host.clone().or_else(|| file.host.clone());
    let config = file.client_config(host.clone().unwrap_or_default());

    checks.push(tracks_dir_check(&file, &config));
    checks.push(track_check(&file, &config));
    checks.push(gamepad_check(&file));
    checks.push(capture_backend_check());
    match host {
        Some(host) => checks.extend(port_checks(&host, &config, timeout)),
        None => checks.push(CheckResult::new(
            "ports",
            CheckStatus::Skip,
            "no host given",
        )),
    }

    let has_fail = checks.iter().any(|c| matches!(c.status, CheckStatus::Fail));
    let output = DoctorOutput {
        checks,
        overall: if has_fail { "fail" } else { "pass" },
    };
    print_doctor(&output, format);

    if has_fail {
        Ok(HEALTH_CHECK_FAILED)
    } else {
        Ok(SUCCESS)
    }
}

fn tracks_dir_check(file: &FileConfig, config: &ClientConfig) -> CheckResult {
    let dir = file
        .audio
        .tracks_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    match list_tracks(&dir) {
        Ok(tracks) if tracks.is_empty() => CheckResult::new(
            "tracks_dir",
            CheckStatus::Warn,
            format!("no *.wav in {}; audio starts silent", dir.display()),
        ),
        Ok(tracks) => {
            let usable = tracks
                .iter()
                .filter_map(|path| probe_track(path).ok())
                .filter(|info| info.is_mixable(config.audio.channels))
                .count();
            let status = if usable == 0 {
                CheckStatus::Warn
            } else {
                CheckStatus::Pass
            };
            CheckResult::new(
                "tracks_dir",
                status,
                format!("{} of {} tracks usable in {}", usable, tracks.len(), dir.display()),
            )
        }
        Err(err) => CheckResult::new(
            "tracks_dir",
            CheckStatus::Fail,
            format!("{}: {err}", dir.display()),
        ),
    }
}

fn track_check(file: &FileConfig, config: &ClientConfig) -> CheckResult {
    let Some(path) = &file.audio.track else {
        return CheckResult::new("track", CheckStatus::Skip, "no track configured");
    };
    match probe_track(path) {
        Ok(info) if info.is_mixable(config.audio.channels) => CheckResult::new(
            "track",
            CheckStatus::Pass,
            format!("{} ({:.1}s)", path.display(), info.duration_secs),
        ),
        Ok(info) => CheckResult::new(
            "track",
            CheckStatus::Fail,
            format!(
                "{}: {} ch {}-bit{}, need {} ch 16-bit",
                path.display(),
                info.channels,
                info.bits_per_sample,
                if info.float { " float" } else { "" },
                config.audio.channels
            ),
        ),
        Err(err) => CheckResult::new("track", CheckStatus::Fail, format!("{}: {err}", path.display())),
    }
}

fn gamepad_check(file: &FileConfig) -> CheckResult {
    #[cfg(target_os = "linux")]
    {
        use carlink::input::evdev::discover_in;

        let found = match &file.gamepad.device {
            Some(device) if device.exists() => Ok(device.clone()),
            Some(device) => Err(format!("{} does not exist", device.display())),
            None => discover_in(Path::new("/dev/input/by-id")).map_err(|err| err.to_string()),
        };
        match found {
            Ok(device) => CheckResult::new(
                "gamepad_device",
                CheckStatus::Pass,
                device.display().to_string(),
            ),
            Err(detail) => CheckResult::new("gamepad_device", CheckStatus::Warn, detail),
        }
    }

    #[cfg(not(target_os = "linux"))]
    {
        let _ = file;
        CheckResult::new(
            "gamepad_device",
            CheckStatus::Skip,
            "no controller backend on this platform",
        )
    }
}

fn capture_backend_check() -> CheckResult {
    if cfg!(feature = "device-cpal") {
        CheckResult::new("capture_backend", CheckStatus::Info, "cpal default input device")
    } else {
        CheckResult::new(
            "capture_backend",
            CheckStatus::Warn,
            "built without device-cpal; microphone is silent",
        )
    }
}

fn port_checks(host: &str, config: &ClientConfig, timeout: Duration) -> Vec<CheckResult> {
    let options = ConnectOptions {
        connect_timeout: timeout,
        ..ConnectOptions::default()
    };
    [
        ("video_port", config.video_port, "video"),
        ("audio_port", config.audio_port, "audio"),
        ("gamepad_port", config.gamepad_port, "gamepad"),
    ]
    .into_iter()
    .map(|(name, port, channel)| match connect(host, port, channel, &options) {
        Ok(_) => CheckResult::new(name, CheckStatus::Pass, format!("{host}:{port} reachable")),
        Err(err) => CheckResult::new(name, CheckStatus::Fail, err.to_string()),
    })
    .collect()
}

fn print_doctor(output: &DoctorOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(output).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("carlink doctor\n");
            for c in &output.checks {
                println!(
                    "  [{:>4}] {:<16} {}",
                    status_text(c.status),
                    c.name,
                    c.detail
                );
            }
            if output.overall == "pass" {
                println!("\n  Result: all checks passed");
            } else {
                println!("\n  Result: one or more checks failed");
            }
        }
        OutputFormat::Raw => {
            println!("{}", output.overall);
        }
    }
}

fn status_text(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Pass => "PASS",
        CheckStatus::Fail => "FAIL",
        CheckStatus::Warn => "WARN",
        CheckStatus::Info => "INFO",
        CheckStatus::Skip => "SKIP",
    }
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
