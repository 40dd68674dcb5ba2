//! CSV export of remote violations

use crate::error::Result;
use crate::types::Violation;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::info;

/// Column order of the exported report
pub const REPORT_HEADER: [&str; 5] = ["organization", "project", "package", "version", "snyk_url"];

/// File name for a report generated at `timestamp`
pub fn report_file_name(timestamp: DateTime<Local>) -> String {
    format!(
        "snyk_report_violations_{}.csv",
        timestamp.format("%Y-%m-%d_%H-%M-%S")
    )
}

/// Render violations as CSV with a header row
pub fn render_csv(violations: &[Violation]) -> String {
    let mut output = String::new();

    output.push_str(&REPORT_HEADER.join(","));
    output.push('\n');

    for violation in violations {
        let row = [
            csv_escape(&violation.organization),
            csv_escape(&violation.project),
            csv_escape(&violation.package),
            csv_escape(&violation.version),
            csv_escape(&violation.snyk_url),
        ];
        output.push_str(&row.join(","));
        output.push('\n');
    }

    output
}

/// Write violations to a timestamped CSV file in `dir`.
///
/// Returns `None` without touching the filesystem when there is nothing to
/// report.
pub fn write_report(dir: &Path, violations: &[Violation]) -> Result<Option<PathBuf>> {
    if violations.is_empty() {
        return Ok(None);
    }

    let path = dir.join(report_file_name(Local::now()));
    std::fs::write(&path, render_csv(violations))?;

    info!("Wrote {} violations to {}", violations.len(), path.display());
    Ok(Some(path))
}

/// Escape a value for CSV output
fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
