//! # snyk_version_gate
//!
//! Detects a package resolved above an allowed version in Snyk scan results:
//! - **Local gate**: check a `snyk test --json` report and fail CI on the first
//!   offending dependency path
//! - **Remote reporter**: walk every organization and project of a Snyk group
//!   through the REST API and export all violations to CSV
//!
//! Both modes share one rule: the target package violates when its version is
//! strictly greater than the configured maximum.
//!
//! ## Quick Start
//!
//! ```no_run
//! use snyk_version_gate::{check_report_file, GateConfig, GateOutcome};
//! use std::path::Path;
//!
//! # fn main() -> snyk_version_gate::Result<()> {
//! let gate = GateConfig::new("package-xyz", "0.0.2");
//! match check_report_file(Path::new("snyk-results.json"), &gate)? {
//!     GateOutcome::Pass { .. } => println!("All clear"),
//!     GateOutcome::Fail(violation) => println!("{} via {}", violation, violation.reason()),
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod export;
mod local;
mod reporter;
mod snyk;
mod types;
mod version;

// Re-export public API
pub use config::{GateConfig, ScanConfig, ScanConfigBuilder, SnykConfig, TOKEN_ENV_VAR};
pub use error::{GateError, Result};
pub use export::{render_csv, report_file_name, write_report, REPORT_HEADER};
pub use local::{check_document, check_report, check_report_file, split_package_entry};
pub use reporter::{collect_violations, project_url, run_report, ReportOutcome};
pub use snyk::{Dependency, Organization, Project, SnykClient};
pub use types::{
    GateOutcome, GateViolation, ReportRun, ScanLevel, SkippedNode, Violation,
    VulnerabilityRecord,
};
pub use version::{is_violation, parse_version, Version};
