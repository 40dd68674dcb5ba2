//! Local gate over a Snyk CLI JSON report
//!
//! Stops at the first record that violates the gate. Missing or undecodable
//! input is an error for the caller, never a pass.

use crate::config::GateConfig;
use crate::error::{GateError, Result};
use crate::types::{GateOutcome, GateViolation, VulnerabilityRecord};
use crate::version::is_violation;
use serde::Deserialize;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info, warn};

/// Run the gate over a report file on disk
pub fn check_report_file(path: &Path, gate: &GateConfig) -> Result<GateOutcome> {
    info!("Reading Snyk results from: {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(GateError::ReportNotFound(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };

    let document: Value =
        serde_json::from_str(&content).map_err(|source| GateError::InvalidReport {
            path: path.to_path_buf(),
            source,
        })?;

    check_document(&document, gate).map_err(|e| match e {
        GateError::JsonError(source) => GateError::InvalidReport {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })
}

/// Run the gate over report content held in memory
pub fn check_report(content: &str, gate: &GateConfig) -> Result<GateOutcome> {
    let document: Value = serde_json::from_str(content)?;
    check_document(&document, gate)
}

/// Run the gate over a decoded report.
///
/// A top-level array is treated as one report per scanned project, as
/// `snyk test --all-projects --json` emits; each is checked in order.
/// Records that cannot be decoded are skipped; a `vulnerabilities` value that
/// is not an array is an error.
pub fn check_document(document: &Value, gate: &GateConfig) -> Result<GateOutcome> {
    info!(
        "Checking Snyk dependencies for '{}' version > '{}'",
        gate.target_package, gate.max_version
    );

    let reports: Vec<&Value> = match document {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };

    let mut scanned = 0;

    for report in reports {
        let Some(section) = report.get("vulnerabilities").filter(|v| !v.is_null()) else {
            info!("No vulnerabilities section found in the JSON");
            continue;
        };

        let Value::Array(items) = section else {
            return Err(GateError::JsonError(serde::de::Error::custom(
                "`vulnerabilities` must be an array",
            )));
        };
        debug!("Scanning {} vulnerability records", items.len());

        for item in items {
            scanned += 1;
            let record = match VulnerabilityRecord::deserialize(item) {
                Ok(record) => record,
                Err(e) => {
                    warn!("Malformed vulnerability record: {}. Skipping.", e);
                    continue;
                }
            };
            if let Some(violation) = check_record(&record, gate) {
                warn!(
                    "Gating violation: {} via {}",
                    violation,
                    violation.reason()
                );
                return Ok(GateOutcome::Fail(violation));
            }
        }
    }

    info!("No violations found in {} records", scanned);
    Ok(GateOutcome::Pass { scanned })
}

/// Apply the gate to the package at the end of one dependency path
fn check_record(record: &VulnerabilityRecord, gate: &GateConfig) -> Option<GateViolation> {
    let entry = record.from.last()?;

    let Some((name, version)) = split_package_entry(entry) else {
        warn!("Malformed dependency path entry '{}'. Skipping.", entry);
        return None;
    };

    match is_violation(version, &gate.max_version, &gate.target_package, name) {
        Ok(true) => Some(GateViolation {
            package: name.to_string(),
            version: version.to_string(),
            path: record.from.clone(),
        }),
        Ok(false) => None,
        Err(e) => {
            warn!(
                "Could not parse version for package '{}': {}. Skipping.",
                name, e
            );
            None
        }
    }
}

/// Split `name@version` on the first `@` after an optional npm scope prefix.
///
/// `@scope/pkg@1.0.0` yields `("@scope/pkg", "1.0.0")`; `a@b@c` yields
/// `("a", "b@c")`. Returns `None` when there is no separator.
pub fn split_package_entry(entry: &str) -> Option<(&str, &str)> {
    let scope_offset = usize::from(entry.starts_with('@'));
    let at = entry[scope_offset..].find('@')? + scope_offset;
    Some((&entry[..at], &entry[at + 1..]))
}
