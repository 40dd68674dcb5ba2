//! Remote reporter tests against a mock Snyk API

use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::json;
use snyk_version_gate::{
    collect_violations, run_report, GateError, ScanConfig, ScanLevel, SnykClient,
};

const API_VERSION: &str = "2023-08-31";

fn config_for(server: &ServerGuard) -> ScanConfig {
    ScanConfig::builder()
        .target_package("package-xyz")
        .max_version("0.0.2")
        .api_url(server.url())
        .group_id("g1")
        .token("test-token")
        .build()
}

fn version_query() -> Matcher {
    Matcher::UrlEncoded("version".into(), API_VERSION.into())
}

async fn mock_json(server: &mut ServerGuard, path: &str, body: serde_json::Value) -> Mock {
    server
        .mock("GET", path)
        .match_query(version_query())
        .with_status(200)
        .with_header("content-type", "application/vnd.api+json")
        .with_body(body.to_string())
        .create_async()
        .await
}

async fn mock_status(server: &mut ServerGuard, path: &str, status: usize) -> Mock {
    server
        .mock("GET", path)
        .match_query(version_query())
        .with_status(status)
        .with_body(r#"{"errors":[{"detail":"boom"}]}"#)
        .create_async()
        .await
}

fn resources(items: &[(&str, serde_json::Value)]) -> serde_json::Value {
    let data: Vec<_> = items
        .iter()
        .map(|(id, attributes)| json!({"id": id, "type": "resource", "attributes": attributes}))
        .collect();
    json!({ "data": data })
}

fn dependency(name: &str, version: &str) -> (&'static str, serde_json::Value) {
    ("dep", json!({"name": name, "version": version}))
}

#[tokio::test]
async fn test_collects_all_violations() {
    let mut server = Server::new_async().await;

    let _m = mock_json(
        &mut server,
        "/groups/g1/orgs",
        resources(&[("o1", json!({"name": "acme"})), ("o2", json!({"name": "globex"}))]),
    )
    .await;
    let _m = mock_json(
        &mut server,
        "/orgs/o1/projects",
        resources(&[("p1", json!({"name": "web"})), ("p2", json!({"name": "api"}))]),
    )
    .await;
    let _m = mock_json(
        &mut server,
        "/orgs/o2/projects",
        resources(&[("p3", json!({"name": "billing"}))]),
    )
    .await;
    let _m = mock_json(
        &mut server,
        "/orgs/o1/projects/p1/dependencies",
        resources(&[
            dependency("package-xyz", "0.0.3"),
            dependency("lodash", "9.9.9"),
        ]),
    )
    .await;
    let _m = mock_json(
        &mut server,
        "/orgs/o1/projects/p2/dependencies",
        resources(&[
            dependency("package-xyz", "0.0.2"),
            dependency("package-xyz", "not-a-version"),
        ]),
    )
    .await;
    let _m = mock_json(
        &mut server,
        "/orgs/o2/projects/p3/dependencies",
        resources(&[dependency("package-xyz", "1.0.0")]),
    )
    .await;

    let config = config_for(&server);
    let client = SnykClient::new(&config.snyk).unwrap();
    let run = collect_violations(&client, &config).await.unwrap();

    assert_eq!(run.organizations_scanned, 2);
    assert_eq!(run.projects_scanned, 3);
    assert_eq!(run.dependencies_scanned, 5);
    assert_eq!(run.invalid_versions, 1);
    assert!(run.skipped.is_empty());

    // Exhaustive and in traversal order
    assert_eq!(run.violations.len(), 2);
    assert_eq!(run.violations[0].organization, "acme");
    assert_eq!(run.violations[0].project, "web");
    assert_eq!(run.violations[0].version, "0.0.3");
    assert_eq!(run.violations[0].snyk_url, "https://snyk.io/org/acme/project/p1");
    assert_eq!(run.violations[1].organization, "globex");
    assert_eq!(run.violations[1].project, "billing");
    assert_eq!(run.violations[1].version, "1.0.0");
}

#[tokio::test]
async fn test_failed_project_is_skipped() {
    let mut server = Server::new_async().await;

    let _m = mock_json(
        &mut server,
        "/groups/g1/orgs",
        resources(&[("o1", json!({"name": "acme"}))]),
    )
    .await;
    let _m = mock_json(
        &mut server,
        "/orgs/o1/projects",
        resources(&[("p1", json!({"name": "broken"})), ("p2", json!({"name": "web"}))]),
    )
    .await;
    let _m = mock_status(&mut server, "/orgs/o1/projects/p1/dependencies", 500).await;
    let _m = mock_json(
        &mut server,
        "/orgs/o1/projects/p2/dependencies",
        resources(&[dependency("package-xyz", "0.1.0")]),
    )
    .await;

    let config = config_for(&server);
    let client = SnykClient::new(&config.snyk).unwrap();
    let run = collect_violations(&client, &config).await.unwrap();

    assert_eq!(run.projects_scanned, 1);
    assert_eq!(run.violations.len(), 1);
    assert_eq!(run.violations[0].project, "web");
    assert!(run.violations.iter().all(|v| v.project != "broken"));

    assert_eq!(run.skipped.len(), 1);
    assert_eq!(run.skipped[0].level, ScanLevel::Project);
    assert_eq!(run.skipped[0].name, "broken");
    assert!(run.skipped[0].error.contains("500"));
}

#[tokio::test]
async fn test_failed_organization_is_skipped() {
    let mut server = Server::new_async().await;

    let _m = mock_json(
        &mut server,
        "/groups/g1/orgs",
        resources(&[("o1", json!({"name": "locked"})), ("o2", json!({"name": "acme"}))]),
    )
    .await;
    let _m = mock_status(&mut server, "/orgs/o1/projects", 403).await;
    let _m = mock_json(
        &mut server,
        "/orgs/o2/projects",
        resources(&[("p1", json!({"name": "web"}))]),
    )
    .await;
    let _m = mock_json(
        &mut server,
        "/orgs/o2/projects/p1/dependencies",
        resources(&[dependency("package-xyz", "0.0.9")]),
    )
    .await;

    let config = config_for(&server);
    let client = SnykClient::new(&config.snyk).unwrap();
    let run = collect_violations(&client, &config).await.unwrap();

    assert_eq!(run.organizations_scanned, 1);
    assert_eq!(run.violations.len(), 1);
    assert_eq!(run.violations[0].organization, "acme");
    assert_eq!(run.skipped[0].level, ScanLevel::Organization);
    assert_eq!(run.skipped[0].name, "locked");
}

#[tokio::test]
async fn test_organization_fetch_failure_aborts_without_file() {
    let mut server = Server::new_async().await;
    let _m = mock_status(&mut server, "/groups/g1/orgs", 401).await;

    let config = config_for(&server);
    let dir = tempfile::tempdir().unwrap();

    let err = run_report(&config, dir.path()).await.unwrap_err();
    assert!(matches!(err, GateError::ApiError { .. }));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_no_violations_writes_no_file() {
    let mut server = Server::new_async().await;

    let _m = mock_json(
        &mut server,
        "/groups/g1/orgs",
        resources(&[("o1", json!({"name": "acme"}))]),
    )
    .await;
    let _m = mock_json(
        &mut server,
        "/orgs/o1/projects",
        resources(&[("p1", json!({"name": "web"}))]),
    )
    .await;
    let _m = mock_json(
        &mut server,
        "/orgs/o1/projects/p1/dependencies",
        resources(&[dependency("package-xyz", "0.0.1")]),
    )
    .await;

    let config = config_for(&server);
    let dir = tempfile::tempdir().unwrap();

    let outcome = run_report(&config, dir.path()).await.unwrap();
    assert!(outcome.export.is_none());
    assert!(!outcome.run.has_violations());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_run_report_writes_csv() {
    let mut server = Server::new_async().await;

    let _m = mock_json(
        &mut server,
        "/groups/g1/orgs",
        resources(&[("o1", json!({"name": "acme"}))]),
    )
    .await;
    let _m = mock_json(
        &mut server,
        "/orgs/o1/projects",
        resources(&[("p1", json!({"name": "web, frontend"}))]),
    )
    .await;
    let _m = mock_json(
        &mut server,
        "/orgs/o1/projects/p1/dependencies",
        resources(&[dependency("package-xyz", "0.0.3")]),
    )
    .await;

    let config = config_for(&server);
    let dir = tempfile::tempdir().unwrap();

    let outcome = run_report(&config, dir.path()).await.unwrap();
    let path = outcome.export.unwrap();
    assert_eq!(path.parent(), Some(dir.path()));

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines[0], "organization,project,package,version,snyk_url");
    assert_eq!(
        lines[1],
        "acme,\"web, frontend\",package-xyz,0.0.3,https://snyk.io/org/acme/project/p1"
    );
}

#[tokio::test]
async fn test_follows_pagination_links() {
    let mut server = Server::new_async().await;

    let _m = mock_json(
        &mut server,
        "/groups/g1/orgs",
        resources(&[("o1", json!({"name": "acme"}))]),
    )
    .await;

    let first_page = json!({
        "data": [{"id": "p1", "type": "project", "attributes": {"name": "web"}}],
        "links": {"next": format!("/orgs/o1/projects?version={}&starting_after=p1", API_VERSION)}
    });
    let second_page = json!({
        "data": [{"id": "p2", "type": "project", "attributes": {"name": "api"}}],
        "links": {}
    });

    let page_one = server
        .mock("GET", "/orgs/o1/projects")
        .match_query(Matcher::Regex(format!("^version={}$", API_VERSION)))
        .with_status(200)
        .with_body(first_page.to_string())
        .create_async()
        .await;
    let page_two = server
        .mock("GET", "/orgs/o1/projects")
        .match_query(Matcher::AllOf(vec![
            version_query(),
            Matcher::UrlEncoded("starting_after".into(), "p1".into()),
        ]))
        .with_status(200)
        .with_body(second_page.to_string())
        .create_async()
        .await;

    let _m = mock_json(
        &mut server,
        "/orgs/o1/projects/p1/dependencies",
        resources(&[dependency("package-xyz", "0.0.1")]),
    )
    .await;
    let _m = mock_json(
        &mut server,
        "/orgs/o1/projects/p2/dependencies",
        resources(&[dependency("package-xyz", "2.0.0")]),
    )
    .await;

    let config = config_for(&server);
    let client = SnykClient::new(&config.snyk).unwrap();
    let run = collect_violations(&client, &config).await.unwrap();

    page_one.assert_async().await;
    page_two.assert_async().await;
    assert_eq!(run.projects_scanned, 2);
    assert_eq!(run.violations.len(), 1);
    assert_eq!(run.violations[0].project, "api");
}

#[tokio::test]
async fn test_sends_token_and_content_type() {
    let mut server = Server::new_async().await;

    let orgs = server
        .mock("GET", "/groups/g1/orgs")
        .match_query(version_query())
        .match_header("authorization", "token test-token")
        .match_header("content-type", "application/vnd.api+json")
        .with_status(200)
        .with_body(r#"{"data": []}"#)
        .create_async()
        .await;

    let config = config_for(&server);
    let client = SnykClient::new(&config.snyk).unwrap();
    let run = collect_violations(&client, &config).await.unwrap();

    orgs.assert_async().await;
    assert_eq!(run.organizations_scanned, 0);
    assert!(!run.has_violations());
}

#[tokio::test]
async fn test_run_report_requires_token() {
    let mut config = ScanConfig::builder().group_id("g1").build();
    config.snyk.token = None;

    let dir = tempfile::tempdir().unwrap();
    let err = run_report(&config, dir.path()).await.unwrap_err();
    assert!(matches!(err, GateError::ConfigError(_)));
}
