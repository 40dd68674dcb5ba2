//! Core data types for gate results and violation reports

use serde::{Deserialize, Serialize};

/// Arrow used when displaying a dependency path
pub const PATH_SEPARATOR: &str = " -> ";

/// A single vulnerability entry from a Snyk CLI JSON report.
///
/// Only the dependency path is needed; other fields are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VulnerabilityRecord {
    /// Dependency path from the root project to the vulnerable package,
    /// each element formatted as `name@version`
    #[serde(default)]
    pub from: Vec<String>,
}

/// The first violation found by the local gate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateViolation {
    /// Package name
    pub package: String,
    /// Resolved version as written in the report
    pub version: String,
    /// Full dependency path that pulled the package in
    pub path: Vec<String>,
}

impl GateViolation {
    /// Human-readable dependency path, root first
    pub fn reason(&self) -> String {
        self.path.join(PATH_SEPARATOR)
    }
}

impl std::fmt::Display for GateViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.package, self.version)
    }
}

/// Result of running the local gate over one report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum GateOutcome {
    /// No record exceeded the allowed version
    Pass {
        /// Number of vulnerability records visited
        scanned: usize,
    },
    /// The first record that exceeded the allowed version
    Fail(GateViolation),
}

impl GateOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass { .. })
    }

    pub fn violation(&self) -> Option<&GateViolation> {
        match self {
            Self::Fail(violation) => Some(violation),
            Self::Pass { .. } => None,
        }
    }
}

/// A dependency found above the allowed version by the remote reporter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub organization: String,
    pub project: String,
    pub package: String,
    pub version: String,
    /// Link to the project in the Snyk web UI
    pub snyk_url: String,
}

/// Level of the remote hierarchy at which a fetch failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanLevel {
    Organization,
    Project,
}

impl std::fmt::Display for ScanLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Organization => write!(f, "organization"),
            Self::Project => write!(f, "project"),
        }
    }
}

/// A node left out of the report because its children could not be fetched
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedNode {
    pub level: ScanLevel,
    pub name: String,
    pub error: String,
}

/// Everything collected during one walk of the remote hierarchy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportRun {
    /// Violations in traversal order
    pub violations: Vec<Violation>,
    /// Organizations and projects whose fetch failed
    pub skipped: Vec<SkippedNode>,
    pub organizations_scanned: usize,
    pub projects_scanned: usize,
    pub dependencies_scanned: usize,
    /// Records of the target package whose version could not be parsed
    pub invalid_versions: usize,
}

impl ReportRun {
    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }
}
