use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Crates whose events follow `--log-level`.
const CARLINK_TARGETS: [&str; 5] = [
    "carlink",
    "carlink_transport",
    "carlink_video",
    "carlink_audio",
    "carlink_input",
];

/// Ceiling for everything else, such as the audio backend.
const DEPENDENCY_CEILING: LevelFilter = LevelFilter::WARN;

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

fn targets(level: LogLevel) -> Targets {
    let level = LevelFilter::from(level);
    CARLINK_TARGETS.iter().fold(
        Targets::new().with_default(level.min(DEPENDENCY_CEILING)),
        |targets, name| targets.with_target(*name, level),
    )
}

/// Log to stderr. Thread names identify the pipeline a line came from;
/// module targets are shown only at debug and trace.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(LevelFilter::from(level))
        .with_ansi(false)
        .with_target(matches!(level, LogLevel::Debug | LogLevel::Trace))
        .with_thread_names(true);
    let filter = targets(level);

    let _ = match format {
        LogFormat::Text => builder.finish().with(filter).try_init(),
        LogFormat::Json => builder.json().finish().with(filter).try_init(),
    };
}

#[cfg(test)]
mod tests {
    use tracing::Level;

    use super::*;

    #[test]
    fn carlink_crates_follow_requested_level() {
        let filter = targets(LogLevel::Debug);
        assert!(filter.would_enable("carlink::cmd::run", &Level::DEBUG));
        assert!(filter.would_enable("carlink_audio::pipeline", &Level::DEBUG));
        assert!(!filter.would_enable("carlink_input::encoder", &Level::TRACE));
    }

    #[test]
    fn dependencies_are_capped_at_warn() {
        let filter = targets(LogLevel::Trace);
        assert!(filter.would_enable("cpal::host::alsa", &Level::WARN));
        assert!(!filter.would_enable("cpal::host::alsa", &Level::INFO));
    }

    #[test]
    fn quiet_level_applies_everywhere() {
        let filter = targets(LogLevel::Error);
        assert!(!filter.would_enable("cpal", &Level::WARN));
        assert!(!filter.would_enable("carlink_video::demux", &Level::WARN));
        assert!(filter.would_enable("carlink_video::demux", &Level::ERROR));
    }
}
