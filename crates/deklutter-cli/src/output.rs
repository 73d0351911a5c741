//! Output renderers and formatting helpers for CLI commands.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::anyhow;
use deklutter_api_models::{LookbackWindow, SampleMessage, ScanResult, ScanSummary, TriageCategory};
use deklutter_session::CleanupOutcome;
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

pub(crate) fn render_scan(
    result: &ScanResult,
    window: LookbackWindow,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&scan_report(result, window))?,
        OutputFormat::Table => print!("{}", format_scan(result, window)),
    }
    Ok(())
}

/// JSON view of a scan: samples are capped the same way as the table.
#[derive(Serialize)]
struct ScanReport<'a> {
    days_back: u16,
    summary: &'a ScanSummary,
    samples: SampleReport<'a>,
    safe_to_delete: &'a [String],
}

#[derive(Serialize)]
struct SampleReport<'a> {
    delete: &'a [SampleMessage],
    review: &'a [SampleMessage],
    keep: &'a [SampleMessage],
}

fn scan_report(result: &ScanResult, window: LookbackWindow) -> ScanReport<'_> {
    ScanReport {
        days_back: window.days(),
        summary: &result.summary,
        samples: SampleReport {
            delete: result.display_samples(TriageCategory::Delete),
            review: result.display_samples(TriageCategory::Review),
            keep: result.display_samples(TriageCategory::Keep),
        },
        safe_to_delete: &result.safe_to_delete,
    }
}

pub(crate) fn format_scan(result: &ScanResult, window: LookbackWindow) -> String {
    let counts = result.summary.counts;
    let mut text = String::new();
    writeln!(text, "Scan of the last {window}").ok();
    writeln!(text, "  {:<8} {:>8}", "delete", counts.delete).ok();
    writeln!(text, "  {:<8} {:>8}", "review", counts.review).ok();
    writeln!(text, "  {:<8} {:>8}", "keep", counts.keep).ok();
    if let Some(size) = result.summary.approx_size_mb {
        writeln!(text, "  approx size of delete set: {size:.1} MB").ok();
    }

    for category in [
        TriageCategory::Delete,
        TriageCategory::Review,
        TriageCategory::Keep,
    ] {
        let samples = result.display_samples(category);
        if samples.is_empty() {
            continue;
        }
        writeln!(text, "{} samples:", category.as_str()).ok();
        for sample in samples {
            writeln!(text, "  - {}", format_sample(sample)).ok();
        }
    }

    if result.has_deletions() {
        writeln!(
            text,
            "{} messages can be moved to trash",
            result.safe_to_delete.len()
        )
        .ok();
    } else {
        writeln!(text, "nothing to clean up").ok();
    }
    text
}

fn format_sample(sample: &SampleMessage) -> String {
    let subject = if sample.subject.trim().is_empty() {
        "(no subject)"
    } else {
        sample.subject.as_str()
    };
    format!(
        "{subject} | {} | {} | {:.1} KB",
        sample.from, sample.date, sample.size_kb
    )
}

#[derive(Serialize)]
struct CleanupReport<'a> {
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    deleted: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
}

fn cleanup_report(outcome: &CleanupOutcome) -> CleanupReport<'_> {
    match outcome {
        CleanupOutcome::NothingToDelete => CleanupReport {
            outcome: "nothing_to_delete",
            count: None,
            deleted: None,
            message: None,
        },
        CleanupOutcome::Declined => CleanupReport {
            outcome: "declined",
            count: None,
            deleted: None,
            message: None,
        },
        CleanupOutcome::Applied { count, outcome } => CleanupReport {
            outcome: "applied",
            count: Some(*count),
            deleted: outcome.deleted,
            message: None,
        },
        CleanupOutcome::Failed { message } => CleanupReport {
            outcome: "failed",
            count: None,
            deleted: None,
            message: Some(message),
        },
    }
}

/// Table output relies on the notices already shown by the prompt; only a
/// declined confirmation needs a line of its own.
pub(crate) fn render_cleanup(outcome: &CleanupOutcome, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&cleanup_report(outcome))?,
        OutputFormat::Table => {
            if matches!(outcome, CleanupOutcome::Declined) {
                println!("Cleanup cancelled; nothing was moved.");
            }
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct StatusReport<'a> {
    signed_in: bool,
    token_path: &'a str,
}

pub(crate) fn render_status(signed_in: bool, path: &Path, format: OutputFormat) -> CliResult<()> {
    let token_path = path.display().to_string();
    match format {
        OutputFormat::Json => print_json(&StatusReport {
            signed_in,
            token_path: &token_path,
        })?,
        OutputFormat::Table => {
            println!("signed in: {}", if signed_in { "yes" } else { "no" });
            println!("token file: {token_path}");
        }
    }
    Ok(())
}

fn print_json(value: &impl Serialize) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    println!("{text}");
    Ok(())
}
