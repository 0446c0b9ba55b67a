//! Registry module for Docker registry interactions
//!
//! The cache talks to a registry only through the [`RegistryApi`] trait. The
//! [`HttpRegistryClient`] implements it on top of the Docker Registry HTTP API
//! v2 with bearer/basic authentication.

pub mod auth;
pub mod client;

use crate::error::{RegistryError, Result};
use async_trait::async_trait;

pub use auth::Auth;
pub use client::{HttpRegistryClient, RegistryClientBuilder};

pub const MEDIA_TYPE_DOCKER_MANIFEST: &str = "application/vnd.docker.distribution.manifest.v2+json";
pub const MEDIA_TYPE_DOCKER_MANIFEST_LIST: &str =
    "application/vnd.docker.distribution.manifest.list.v2+json";
pub const MEDIA_TYPE_OCI_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";
pub const MEDIA_TYPE_OCI_INDEX: &str = "application/vnd.oci.image.index.v1+json";

/// One page of the registry catalog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogPage {
    pub repositories: Vec<String>,
    /// Opaque cursor for the following page, `None` on the last page
    pub next: Option<String>,
}

impl CatalogPage {
    pub fn new(repositories: Vec<String>, next: Option<String>) -> Self {
        Self { repositories, next }
    }
}

/// Manifest descriptor a tag or digest resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub digest: String,
    pub media_type: String,
}

impl Descriptor {
    pub fn is_index(&self) -> bool {
        matches!(
            self.media_type.as_str(),
            MEDIA_TYPE_DOCKER_MANIFEST_LIST | MEDIA_TYPE_OCI_INDEX
        )
    }
}

/// Cursor for the page after `current`, `None` on the last page. A registry
/// that hands back the cursor it was just given fails the walk.
pub fn advance_cursor(
    current: Option<&str>,
    next: Option<String>,
    listing: &str,
) -> Result<Option<String>> {
    match next {
        Some(next) if current == Some(next.as_str()) => Err(RegistryError::Registry(format!(
            "{} pagination did not advance past {}",
            listing, next
        ))),
        next => Ok(next),
    }
}

/// Registry operations consumed by the metadata cache.
///
/// Implementations bound each call with their own timeout and perform any
/// low-level retries themselves.
#[async_trait]
pub trait RegistryApi: Send + Sync {
    /// Fetch one catalog page; `None` requests the first page
    async fn list_catalog_page(&self, cursor: Option<&str>) -> Result<CatalogPage>;

    /// All tags of one repository
    async fn list_tags(&self, repository: &str) -> Result<Vec<String>>;

    /// Resolve a tag or digest reference to its manifest descriptor
    async fn resolve_descriptor(&self, repository: &str, reference: &str) -> Result<Descriptor>;

    /// Delete a manifest by digest, removing every tag that points to it
    async fn delete_by_digest(&self, repository: &str, digest: &str) -> Result<()>;
}
