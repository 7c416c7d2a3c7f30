//! Run report: one status line per device, in device order

pub mod email;

use chrono::{DateTime, Utc};
use colored::Colorize;

use crate::models::outcome::OrchestrationOutcome;
use crate::update::orchestrator::DeviceReport;

/// First line of every emailed report
pub const REPORT_PREAMBLE: &str =
    "This is an automatically generated e-mail. dynupd has performed the following task:";

/// Human-readable status lines for one device
pub fn device_lines(report: &DeviceReport) -> Vec<String> {
    let target = format!("{} to {} - {}", report.file, report.hostname, report.device);
    let mut lines = Vec::new();

    if report.outcome.uploaded() {
        lines.push(format!("SUCCESS: Upload of {}", target));
    }

    let line = match &report.outcome {
        OrchestrationOutcome::Skipped { current, .. } => format!(
            "SKIPPED: Upload of {}. Content version we tried to install is the same or older as current version ({})",
            target, current
        ),
        OrchestrationOutcome::VersionCheckFailed(reason) => format!(
            "FAILED: Unable to check current content versions on {} - {}. Skipping device: {}",
            report.hostname, report.device, reason
        ),
        OrchestrationOutcome::UploadFailed(reason) => {
            format!("FAILED: Error while uploading {}. Skipping device: {}", target, reason)
        }
        OrchestrationOutcome::InstallStarted => format!(
            "SUCCESS: Installation of {} started. Did not wait for completion",
            target
        ),
        OrchestrationOutcome::InstallSucceeded => {
            format!("SUCCESS: Installation of {} successfully completed", target)
        }
        OrchestrationOutcome::InstallFailed(reason) => {
            format!("FAILED: Installation of {}: {}", target, reason)
        }
        OrchestrationOutcome::InstallTimedOut(reason) => {
            format!("TIMEOUT: Installation of {}: {}", target, reason)
        }
        OrchestrationOutcome::Cancelled(reason) => {
            format!("CANCELLED: Installation of {}: {}", target, reason)
        }
        OrchestrationOutcome::NotStarted(reason) => format!(
            "CANCELLED: Skipping {} - {}: {}",
            report.hostname, report.device, reason
        ),
    };
    lines.push(line);
    lines
}

/// Status lines for a whole run
pub fn status_lines(reports: &[DeviceReport]) -> Vec<String> {
    reports.iter().flat_map(device_lines).collect()
}

/// Body of the emailed report
pub fn email_body(run_id: &str, started_at: DateTime<Utc>, lines: &[String]) -> String {
    format!(
        "{}\n\nRun {} started {}\n\n{}\n",
        REPORT_PREAMBLE,
        run_id,
        started_at.format("%Y-%m-%d %H:%M:%S UTC"),
        lines.join("\n")
    )
}

/// Colour a status line by its prefix for terminal output
pub fn colorize(line: &str) -> String {
    if line.starts_with("SUCCESS") {
        line.green().to_string()
    } else if line.starts_with("SKIPPED") {
        line.yellow().to_string()
    } else {
        line.red().to_string()
    }
}

/// True when no device ended in a failure
pub fn all_succeeded(reports: &[DeviceReport]) -> bool {
    reports.iter().all(|r| r.outcome.is_success())
}
