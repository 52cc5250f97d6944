use std::path::PathBuf;

use carlink::audio::{list_tracks, probe_track, AudioConfig, TrackInfo};
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

use crate::cmd::TracksArgs;
use crate::config::FileConfig;
use crate::exit::{audio_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

#[derive(Debug, Serialize)]
struct TrackRow {
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    channels: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sample_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bits_per_sample: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
    usable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct TracksOutput {
    dir: String,
    channels: u16,
    sample_rate: u32,
    tracks: Vec<TrackRow>,
}

pub fn run(args: TracksArgs, format: OutputFormat, file: &FileConfig) -> CliResult<i32> {
    let dir = args
        .dir
        .or_else(|| file.audio.tracks_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));
    let audio = file.client_config(String::new()).audio;

    let tracks = list_tracks(&dir)
        .map_err(|err| audio_error(&format!("cannot list {}", dir.display()), err))?
        .into_iter()
        .map(|path| match probe_track(&path) {
            Ok(info) => row(&info, &audio),
            Err(err) => TrackRow {
                path: path.display().to_string(),
                channels: None,
                sample_rate: None,
                bits_per_sample: None,
                duration_secs: None,
                usable: false,
                error: Some(err.to_string()),
            },
        })
        .collect();

    let output = TracksOutput {
        dir: dir.display().to_string(),
        channels: audio.channels,
        sample_rate: audio.sample_rate,
        tracks,
    };
    print_tracks(&output, format);
    Ok(SUCCESS)
}

fn row(info: &TrackInfo, audio: &AudioConfig) -> TrackRow {
    let usable = info.is_mixable(audio.channels);
    let error = if usable {
        None
    } else if info.float || info.bits_per_sample != 16 {
        Some(format!(
            "{}-bit {} samples; need 16-bit integer PCM",
            info.bits_per_sample,
            if info.float { "float" } else { "integer" }
        ))
    } else {
        Some(format!(
            "{} channels; stream has {}",
            info.channels, audio.channels
        ))
    };
    TrackRow {
        path: info.path.display().to_string(),
        channels: Some(info.channels),
        sample_rate: Some(info.sample_rate),
        bits_per_sample: Some(info.bits_per_sample),
        duration_secs: Some(info.duration_secs),
        usable,
        error,
    }
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn print_tracks(output: &TracksOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(output).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TRACK", "CH", "RATE", "BITS", "SECONDS", "USABLE", "NOTE"]);
            for t in &output.tracks {
                table.add_row(vec![
                    t.path.clone(),
                    opt(t.channels),
                    opt(t.sample_rate),
                    opt(t.bits_per_sample),
                    opt(t.duration_secs.map(|s| format!("{s:.1}"))),
                    if t.usable { "yes" } else { "no" }.to_string(),
                    t.error.clone().unwrap_or_default(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "tracks in {} (stream: {} ch, {} Hz)\n",
                output.dir, output.channels, output.sample_rate
            );
            if output.tracks.is_empty() {
                println!("  no *.wav files");
            }
            for t in &output.tracks {
                let mark = if t.usable { "ok" } else { "--" };
                match &t.error {
                    Some(error) => println!("  [{mark}] {}  ({error})", t.path),
                    None => println!("  [{mark}] {}", t.path),
                }
            }
        }
        OutputFormat::Raw => {
            for t in output.tracks.iter().filter(|t| t.usable) {
                println!("{}", t.path);
            }
        }
    }
}
