//! HTTP client for the Snyk REST API

use super::model::{Collection, Dependency, Organization, Project, Resource};
use crate::config::{SnykConfig, TOKEN_ENV_VAR};
use crate::error::{GateError, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
const JSON_API: &str = "application/vnd.api+json";

/// Client for the group, organization and project collection endpoints.
///
/// Requests are issued one at a time. Collections follow `links.next` until
/// the server stops returning one.
pub struct SnykClient {
    client: Client,
    api_url: String,
    base: Url,
    api_version: String,
    max_pages: u32,
}

impl SnykClient {
    pub fn new(config: &SnykConfig) -> Result<Self> {
        let token = config.token.as_deref().ok_or_else(|| {
            GateError::config(format!("{} environment variable not set", TOKEN_ENV_VAR))
        })?;

        let api_url = config.api_url.trim_end_matches('/').to_string();
        let base = Url::parse(&api_url).map_err(|e| {
            GateError::config(format!("Invalid api_url '{}': {}", config.api_url, e))
        })?;

        Ok(Self {
            client: build_client(config, token)?,
            api_url,
            base,
            api_version: config.api_version.clone(),
            max_pages: config.max_pages.max(1),
        })
    }

    /// Fetch all organizations within a group
    pub async fn organizations(&self, group_id: &str) -> Result<Vec<Organization>> {
        let path = format!("/groups/{}/orgs", urlencoding::encode(group_id));
        self.fetch_collection(&path).await
    }

    /// Fetch all projects for an organization
    pub async fn projects(&self, org_id: &str) -> Result<Vec<Project>> {
        let path = format!("/orgs/{}/projects", urlencoding::encode(org_id));
        self.fetch_collection(&path).await
    }

    /// Fetch the dependencies of a project
    pub async fn dependencies(&self, org_id: &str, project_id: &str) -> Result<Vec<Dependency>> {
        let path = format!(
            "/orgs/{}/projects/{}/dependencies",
            urlencoding::encode(org_id),
            urlencoding::encode(project_id)
        );
        self.fetch_collection(&path).await
    }

    /// Fetch every page of a collection endpoint
    async fn fetch_collection<A: DeserializeOwned>(&self, path: &str) -> Result<Vec<Resource<A>>> {
        let mut url = format!(
            "{}{}?version={}",
            self.api_url,
            path,
            urlencoding::encode(&self.api_version)
        );
        let mut items = Vec::new();
        let mut pages = 0u32;

        loop {
            let page: Collection<A> = self.get_page(&url).await?;
            pages += 1;

            let next = page.next_link().map(|link| self.resolve_link(link));
            items.extend(page.data);

            match next {
                Some(next) if next == url => {
                    warn!("Pagination link repeats {}; stopping", url);
                    break;
                }
                Some(_) if pages >= self.max_pages => {
                    warn!(
                        "Stopped after {} pages of {}; results may be incomplete",
                        pages, path
                    );
                    break;
                }
                Some(next) => url = next,
                None => break,
            }
        }

        debug!("Fetched {} items from {} in {} page(s)", items.len(), path, pages);
        Ok(items)
    }

    async fn get_page<A: DeserializeOwned>(&self, url: &str) -> Result<Collection<A>> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| GateError::network(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GateError::api("Snyk", format!("HTTP {} for {}", status, url)));
        }

        Ok(response.json().await?)
    }

    /// Turn a `links.next` value into an absolute URL.
    ///
    /// Snyk returns next links relative to the host (`/rest/orgs/...`) or to
    /// the API root (`/orgs/...`); both are accepted.
    fn resolve_link(&self, next: &str) -> String {
        if next.starts_with("http://") || next.starts_with("https://") {
            return next.to_string();
        }

        let base_path = self.base.path().trim_end_matches('/');
        if !base_path.is_empty() && next.starts_with(&format!("{}/", base_path)) {
            if let Ok(joined) = self.base.join(next) {
                return joined.to_string();
            }
        }

        if next.starts_with('/') {
            format!("{}{}", self.api_url, next)
        } else {
            format!("{}/{}", self.api_url, next)
        }
    }
}

/// Build HTTP client with Snyk authentication
fn build_client(config: &SnykConfig, token: &str) -> Result<Client> {
    let mut auth = HeaderValue::from_str(&format!("token {}", token))
        .map_err(|_| GateError::config("API token contains characters not allowed in a header"))?;
    auth.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, auth);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_API));

    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(config.timeout())
        .default_headers(headers)
        .build()
        .map_err(|e| GateError::network(format!("Failed to build HTTP client: {}", e)))
}
