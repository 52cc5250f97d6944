use std::collections::BTreeMap;
use std::io::IsTerminal;

use carlink::{Outcome, PipelineReport};
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct ReportOutput<'a> {
    pipeline: &'static str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    counters: BTreeMap<&'static str, u64>,
}

#[derive(Serialize)]
struct RunOutput<'a> {
    host: &'a str,
    pipelines: Vec<ReportOutput<'a>>,
}

fn status(report: &PipelineReport) -> &'static str {
    match report.outcome {
        Outcome::Stopped => "stopped",
        Outcome::Failed { .. } => "failed",
    }
}

fn error_text(report: &PipelineReport) -> Option<&str> {
    match &report.outcome {
        Outcome::Stopped => None,
        Outcome::Failed { message, .. } => Some(message),
    }
}

fn counters_text(report: &PipelineReport) -> String {
    report
        .counters
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn print_reports(host: &str, reports: &[PipelineReport], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = RunOutput {
                host,
                pipelines: reports
                    .iter()
                    .map(|report| ReportOutput {
                        pipeline: report.pipeline.name(),
                        status: status(report),
                        failure_kind: match &report.outcome {
                            Outcome::Failed { kind, .. } => Some(format!("{kind:?}").to_lowercase()),
                            Outcome::Stopped => None,
                        },
                        error: error_text(report),
                        counters: report.counters.iter().copied().collect(),
                    })
                    .collect(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PIPELINE", "STATUS", "COUNTERS", "ERROR"]);
            for report in reports {
                table.add_row(vec![
                    report.pipeline.name().to_string(),
                    status(report).to_string(),
                    counters_text(report),
                    error_text(report).unwrap_or("").to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("carlink session with {host}\n");
            for report in reports {
                println!(
                    "  [{:>7}] {:<6} {}",
                    status(report),
                    report.pipeline.name(),
                    counters_text(report)
                );
                if let Some(error) = error_text(report) {
                    println!("            error: {error}");
                }
            }
        }
        OutputFormat::Raw => {
            for report in reports {
                println!("{} {}", report.pipeline.name(), status(report));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carlink::{FailureKind, Pipeline};

    #[test]
    fn report_output_serializes_failure() {
        let report = PipelineReport {
            pipeline: Pipeline::Video,
            outcome: Outcome::Failed {
                kind: FailureKind::Connect,
                message: "refused".to_string(),
            },
            counters: vec![("frames_decoded", 0)],
        };
        let out = ReportOutput {
            pipeline: report.pipeline.name(),
            status: status(&report),
            failure_kind: Some("connect".to_string()),
            error: error_text(&report),
            counters: report.counters.iter().copied().collect(),
        };
        let json = serde_json::to_string(&out).unwrap();
        assert!(json.contains("\"status\":\"failed\""));
        assert!(json.contains("\"error\":\"refused\""));
        assert!(json.contains("\"frames_decoded\":0"));
        assert_eq!(counters_text(&report), "frames_decoded=0");
    }
}
