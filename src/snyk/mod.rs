//! Snyk REST API access

pub mod client;
pub mod model;

pub use client::SnykClient;
pub use model::{Dependency, Organization, Project};
