mod cmd;
mod config;
mod exit;
mod logging;
mod output;

use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "carlink", version, about = "Remote-control client for a camera car")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    /// JSON configuration file.
    #[arg(long, value_name = "PATH", env = "CARLINK_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format, cli.config.as_deref());

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::MicBackend;

    #[test]
    fn parses_run_subcommand() {
        let cli = Cli::try_parse_from([
            "carlink",
            "run",
            "car.local",
            "--no-gamepad",
            "--mic",
            "none",
            "--snapshot",
            "/tmp/view.jpg",
        ])
        .expect("run args should parse");

        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.host.as_deref(), Some("car.local"));
        assert!(args.no_gamepad);
        assert_eq!(args.mic, MicBackend::Silent);
    }

    #[test]
    fn rejects_conflicting_track_args() {
        let err = Cli::try_parse_from([
            "carlink",
            "run",
            "car.local",
            "--track",
            "a.wav",
            "--tracks-dir",
            "music",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn rejects_zero_fps() {
        let err = Cli::try_parse_from(["carlink", "run", "car.local", "--fps", "0"])
            .expect_err("zero fps should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn parses_doctor_with_host() {
        let cli = Cli::try_parse_from(["carlink", "doctor", "car.local", "--timeout", "500ms"])
            .expect("doctor args should parse");
        assert!(matches!(cli.command, Command::Doctor(_)));
    }
}
