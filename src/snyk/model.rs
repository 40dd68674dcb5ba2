//! JSON:API shapes returned by the Snyk REST API

use serde::Deserialize;

/// One page of a collection endpoint
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "A: Deserialize<'de>"))]
pub struct Collection<A> {
    #[serde(default)]
    pub data: Vec<Resource<A>>,
    #[serde(default)]
    pub links: Option<Links>,
}

impl<A> Collection<A> {
    /// Link to the following page, if the server reported one
    pub fn next_link(&self) -> Option<&str> {
        self.links
            .as_ref()
            .and_then(|links| links.next.as_deref())
            .filter(|next| !next.is_empty())
    }
}

/// A single resource with its identifier and attributes
#[derive(Debug, Clone, Deserialize)]
pub struct Resource<A> {
    pub id: String,
    pub attributes: A,
}

#[derive(Debug, Default, Deserialize)]
pub struct Links {
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrganizationAttributes {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectAttributes {
    pub name: String,
}

/// Package name and resolved version of one project dependency
#[derive(Debug, Clone, Deserialize)]
pub struct DependencyAttributes {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
}

pub type Organization = Resource<OrganizationAttributes>;
pub type Project = Resource<ProjectAttributes>;
pub type Dependency = Resource<DependencyAttributes>;
