//! The `oralexam score` command.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

use oralexam_core::engine::{ProgressReporter, ScoringRequest};
use oralexam_core::model::ScoreSource;
use oralexam_core::parser;
use oralexam_core::report::ScoringReport;

use crate::OutputFormat;

/// Console progress reporter.
struct ConsoleReporter {
    names: Vec<String>,
}

impl ProgressReporter for ConsoleReporter {
    fn on_attempt_complete(&self, index: usize, report: &ScoringReport) {
        let name = self.names.get(index).map(String::as_str).unwrap_or("?");
        eprintln!("  Done: {name} :: {}", report.summary());
    }

    fn on_batch_complete(&self, total: usize, elapsed: Duration) {
        eprintln!(
            "\nScored {total} attempt(s) ({:.1}s)",
            elapsed.as_secs_f64()
        );
    }
}

pub async fn execute(
    attempt_path: PathBuf,
    offline: bool,
    format: OutputFormat,
    output: Option<PathBuf>,
    parallelism: Option<usize>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let (config, pipeline) = super::build_pipeline(config_path.as_deref(), offline)?;
    let parallelism = parallelism.unwrap_or(config.parallelism);
    anyhow::ensure!(parallelism >= 1, "parallelism must be at least 1");

    let attempts = parser::load_attempts(&attempt_path)?;
    anyhow::ensure!(
        !attempts.is_empty(),
        "no attempt files found in {}",
        attempt_path.display()
    );

    eprintln!(
        "oralexam v{}: scoring {} attempt(s) with assessor '{}'",
        env!("CARGO_PKG_VERSION"),
        attempts.len(),
        pipeline.assessor_name()
    );

    let names: Vec<String> = attempts
        .iter()
        .map(|a| a.relative_name(&attempt_path))
        .collect();
    let requests: Vec<ScoringRequest> = attempts.into_iter().map(|a| a.request).collect();
    let reporter = ConsoleReporter {
        names: names.clone(),
    };

    let reports = pipeline
        .evaluate_batch(&requests, parallelism, &reporter)
        .await?;

    match format {
        OutputFormat::Table => print_summary(&names, &reports),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
    }

    if let Some(dir) = output {
        for (name, report) in names.iter().zip(&reports) {
            let path = dir.join(format!("{name}-report.json"));
            report.save_json(&path)?;
            eprintln!("Report saved to: {}", path.display());
        }
    }

    Ok(())
}

fn source_label(source: &ScoreSource) -> String {
    match source {
        ScoreSource::Supplied => "supplied".to_string(),
        ScoreSource::PartiallyDefaulted { missing } => {
            format!("partial ({} defaulted)", missing.len())
        }
        ScoreSource::Defaulted { .. } => "defaulted".to_string(),
    }
}

fn print_summary(names: &[String], reports: &[ScoringReport]) {
    use comfy_table::{Cell, Table};

    let mut table = Table::new();
    table.set_header(vec![
        "Attempt",
        "Section",
        "Topic",
        "Composite",
        "CLB",
        "Readiness",
        "Qualitative",
    ]);

    for (name, report) in names.iter().zip(reports) {
        table.add_row(vec![
            Cell::new(name),
            Cell::new(report.section),
            Cell::new(report.topic_id),
            Cell::new(format!("{:.2}", report.result.composite_score)),
            Cell::new(report.result.clb_level),
            Cell::new(report.result.readiness),
            Cell::new(source_label(&report.qualitative.source)),
        ]);
    }

    println!("{table}");

    for (name, report) in names.iter().zip(reports) {
        if report.result.improvement_points.is_empty() {
            continue;
        }
        println!("\n{name}:");
        for point in &report.result.improvement_points {
            println!("  - {point}");
        }
    }
}
