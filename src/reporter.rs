//! Remote reporter: walk group → organizations → projects → dependencies
//!
//! Unlike the local gate this collects every violation. A failed fetch below
//! the group level skips that node and the walk continues.

use crate::config::ScanConfig;
use crate::error::Result;
use crate::export::write_report;
use crate::snyk::{Dependency, Organization, Project, SnykClient};
use crate::types::{ReportRun, ScanLevel, SkippedNode, Violation};
use crate::version::is_violation;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Result of a full report run
#[derive(Debug, Clone)]
pub struct ReportOutcome {
    pub run: ReportRun,
    /// Path of the CSV export, `None` when nothing violated the gate
    pub export: Option<PathBuf>,
}

/// Validate configuration, walk the group and write the CSV export into
/// `output_dir`
pub async fn run_report(config: &ScanConfig, output_dir: &Path) -> Result<ReportOutcome> {
    config.gate.validate()?;
    config.snyk.validate()?;

    info!("Starting Snyk API report generation");

    let client = SnykClient::new(&config.snyk)?;
    let run = collect_violations(&client, config).await?;

    let export = write_report(output_dir, &run.violations)?;
    if export.is_none() {
        info!("No violations found across all projects");
    }

    Ok(ReportOutcome { run, export })
}

/// Walk the configured group and collect every violation.
///
/// Fails only when the organizations of the group cannot be listed.
pub async fn collect_violations(client: &SnykClient, config: &ScanConfig) -> Result<ReportRun> {
    let group_id = &config.snyk.group_id;

    info!("Fetching organizations for group {}", group_id);
    let organizations = client.organizations(group_id).await?;
    info!("Found {} organizations", organizations.len());

    let mut run = ReportRun::default();

    for org in &organizations {
        scan_organization(client, config, org, &mut run).await;
    }

    info!(
        "Scanned {} organizations, {} projects, {} dependencies: {} violations, {} skipped",
        run.organizations_scanned,
        run.projects_scanned,
        run.dependencies_scanned,
        run.violations.len(),
        run.skipped.len()
    );

    Ok(run)
}

async fn scan_organization(
    client: &SnykClient,
    config: &ScanConfig,
    org: &Organization,
    run: &mut ReportRun,
) {
    let org_name = &org.attributes.name;
    debug!("Fetching projects for organization: {}", org_name);

    let projects = match client.projects(&org.id).await {
        Ok(projects) => projects,
        Err(e) => {
            warn!("Error fetching projects for org {}: {}", org_name, e);
            run.skipped.push(SkippedNode {
                level: ScanLevel::Organization,
                name: org_name.clone(),
                error: e.to_string(),
            });
            return;
        }
    };

    run.organizations_scanned += 1;
    info!("Found {} projects in {}", projects.len(), org_name);

    for project in &projects {
        scan_project(client, config, org, project, run).await;
    }
}

async fn scan_project(
    client: &SnykClient,
    config: &ScanConfig,
    org: &Organization,
    project: &Project,
    run: &mut ReportRun,
) {
    let project_name = &project.attributes.name;

    let dependencies = match client.dependencies(&org.id, &project.id).await {
        Ok(dependencies) => dependencies,
        Err(e) => {
            warn!(
                "Error fetching dependencies for project {}: {}",
                project_name, e
            );
            run.skipped.push(SkippedNode {
                level: ScanLevel::Project,
                name: project_name.clone(),
                error: e.to_string(),
            });
            return;
        }
    };

    run.projects_scanned += 1;

    for dependency in &dependencies {
        run.dependencies_scanned += 1;
        match check_dependency(config, org, project, dependency) {
            Ok(Some(violation)) => {
                warn!(
                    "{}@{} in {}/{} exceeds {}",
                    violation.package,
                    violation.version,
                    violation.organization,
                    violation.project,
                    config.gate.max_version
                );
                run.violations.push(violation);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(
                    "Skipping unparsable version for '{}' in project '{}': {}",
                    dependency.attributes.name, project_name, e
                );
                run.invalid_versions += 1;
            }
        }
    }
}

fn check_dependency(
    config: &ScanConfig,
    org: &Organization,
    project: &Project,
    dependency: &Dependency,
) -> Result<Option<Violation>> {
    let gate = &config.gate;
    let attributes = &dependency.attributes;

    if !is_violation(
        &attributes.version,
        &gate.max_version,
        &gate.target_package,
        &attributes.name,
    )? {
        return Ok(None);
    }

    Ok(Some(Violation {
        organization: org.attributes.name.clone(),
        project: project.attributes.name.clone(),
        package: attributes.name.clone(),
        version: attributes.version.clone(),
        snyk_url: project_url(&config.snyk.web_url, &org.attributes.name, &project.id),
    }))
}

/// Link to a project in the Snyk web UI
pub fn project_url(web_url: &str, org_name: &str, project_id: &str) -> String {
    format!(
        "{}/org/{}/project/{}",
        web_url.trim_end_matches('/'),
        urlencoding::encode(org_name),
        urlencoding::encode(project_id)
    )
}
