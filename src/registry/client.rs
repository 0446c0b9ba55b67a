//! HTTP implementation of [`RegistryApi`] over the Docker Registry HTTP API v2
//!
//! - Catalog listing (GET /v2/_catalog, `Link` pagination)
//! - Tag listing (GET /v2/{name}/tags/list, `Link` pagination)
//! - Descriptor resolution (HEAD /v2/{name}/manifests/{reference})
//! - Manifest deletion (DELETE /v2/{name}/manifests/{digest})

use crate::config::RegistryConfig;
use crate::error::handlers::{HttpErrorHandler, NetworkErrorHandler};
use crate::error::{RegistryError, Result};
use crate::logging::Logger;
use crate::registry::auth::{Auth, AuthChallenge};
use crate::registry::{
    CatalogPage, Descriptor, RegistryApi, advance_cursor, MEDIA_TYPE_DOCKER_MANIFEST,
    MEDIA_TYPE_DOCKER_MANIFEST_LIST, MEDIA_TYPE_OCI_INDEX, MEDIA_TYPE_OCI_MANIFEST,
};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, LINK, WWW_AUTHENTICATE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

const USER_AGENT: &str = "registry-catalog-cache";
const DOCKER_CONTENT_DIGEST: &str = "Docker-Content-Digest";

#[derive(Debug, Deserialize)]
struct CatalogResponse {
    #[serde(default)]
    repositories: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    tags: Option<Vec<String>>,
}

pub struct RegistryClientBuilder {
    address: String,
    username: Option<String>,
    password: Option<String>,
    skip_tls: bool,
    timeout: Duration,
    page_size: usize,
    output: Logger,
}

impl RegistryClientBuilder {
    pub fn new(address: String) -> Self {
        let defaults = RegistryConfig::default();
        Self {
            address,
            username: None,
            password: None,
            skip_tls: false,
            timeout: defaults.timeout_duration(),
            page_size: defaults.catalog_page_size,
            output: Logger::default(),
        }
    }

    /// Builder preloaded from a validated [`RegistryConfig`]; reads the
    /// password file if one is configured.
    pub fn from_config(config: &RegistryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config.address.clone())
            .with_credentials(config.username.clone(), config.resolve_password()?)
            .with_skip_tls(config.skip_tls)
            .with_timeout(config.timeout_duration())
            .with_page_size(config.catalog_page_size))
    }

    pub fn with_credentials(mut self, username: Option<String>, password: Option<String>) -> Self {
        self.username = username;
        self.password = password;
        self
    }

    pub fn with_skip_tls(mut self, skip_tls: bool) -> Self {
        self.skip_tls = skip_tls;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_logger(mut self, output: Logger) -> Self {
        self.output = output;
        self
    }

    pub fn build(self) -> Result<HttpRegistryClient> {
        let mut builder = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(self.timeout);
        if self.skip_tls {
            builder = builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true);
        }
        let client = builder
            .build()
            .map_err(|e| RegistryError::Network(format!("Failed to create HTTP client: {}", e)))?;

        let address = self.address.trim_end_matches('/').to_string();
        let base = Url::parse(&address)?;
        let output = self.output.with_component("registry.client");
        let auth = Auth::new(client.clone(), self.username, self.password, output.clone());

        Ok(HttpRegistryClient {
            client,
            address,
            base,
            auth,
            page_size: self.page_size,
            output,
        })
    }
}

pub struct HttpRegistryClient {
    client: Client,
    address: String,
    base: Url,
    auth: Auth,
    page_size: usize,
    output: Logger,
}

impl HttpRegistryClient {
    pub fn builder(address: String) -> RegistryClientBuilder {
        RegistryClientBuilder::new(address)
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(Url::parse(&format!("{}/v2/{}", self.address, path))?)
    }

    /// Resolve a `Link` cursor, which registries send as an absolute path
    fn cursor_url(&self, cursor: &str) -> Result<Url> {
        Ok(self.base.join(cursor)?)
    }

    /// Send a request, answering one authentication challenge if the
    /// registry asks for it.
    async fn send<F>(&self, build: F, scope: &str, operation: &str) -> Result<Response>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let response = self
            .auth
            .authorize(build(&self.client), scope)
            .send()
            .await
            .map_err(|e| NetworkErrorHandler::handle_network_error(&e, operation))?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let challenge = response
            .headers()
            .get(WWW_AUTHENTICATE)
            .and_then(|h| h.to_str().ok())
            .and_then(AuthChallenge::parse);

        let Some(challenge) = challenge else {
            return Ok(response);
        };

        self.output
            .detail(&format!("Authentication challenge for {}: {:?}", operation, challenge));

        if !self.auth.respond(&challenge, scope).await? {
            return Ok(response);
        }

        self.auth
            .authorize(build(&self.client), scope)
            .send()
            .await
            .map_err(|e| NetworkErrorHandler::handle_network_error(&e, operation))
    }

    async fn check_status(response: Response, operation: &str) -> Result<Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error response".to_string());
        Err(HttpErrorHandler::handle_registry_error(status, &error_text, operation))
    }
}

#[async_trait]
impl RegistryApi for HttpRegistryClient {
    async fn list_catalog_page(&self, cursor: Option<&str>) -> Result<CatalogPage> {
        let url = match cursor {
            Some(cursor) => self.cursor_url(cursor)?,
            None => {
                let mut url = self.endpoint("_catalog")?;
                url.query_pairs_mut()
                    .append_pair("n", &self.page_size.to_string());
                url
            }
        };
        self.output.debug(&format!("Fetching catalog page: {}", url));

        let response = self
            .send(|c| c.get(url.clone()), "registry:catalog:*", "catalog listing")
            .await?;
        let response = Self::check_status(response, "catalog listing").await?;
        let next = next_link(&response);
        let body: CatalogResponse = response
            .json()
            .await
            .map_err(|e| RegistryError::Parse(format!("Failed to parse catalog response: {}", e)))?;

        Ok(CatalogPage::new(body.repositories.unwrap_or_default(), next))
    }

    async fn list_tags(&self, repository: &str) -> Result<Vec<String>> {
        let scope = format!("repository:{}:pull", repository);
        let mut cursor: Option<String> = None;
        let mut tags = Vec::new();

        loop {
            let url = match cursor.as_deref() {
                Some(cursor) => self.cursor_url(cursor)?,
                None => self.endpoint(&format!("{}/tags/list", repository))?,
            };
            let response = self
                .send(|c| c.get(url.clone()), &scope, "tag listing")
                .await?;
            let response = Self::check_status(response, "tag listing").await?;
            let next = next_link(&response);
            let body: TagsResponse = response.json().await.map_err(|e| {
                RegistryError::Parse(format!("Failed to parse tags response: {}", e))
            })?;
            tags.extend(body.tags.unwrap_or_default());

            match advance_cursor(cursor.as_deref(), next, "Tag")? {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        self.output
            .debug(&format!("Found {} tags for repository {}", tags.len(), repository));
        Ok(tags)
    }

    async fn resolve_descriptor(&self, repository: &str, reference: &str) -> Result<Descriptor> {
        let scope = format!("repository:{}:pull", repository);
        let url = self.endpoint(&format!("{}/manifests/{}", repository, reference))?;
        let accept = [
            MEDIA_TYPE_DOCKER_MANIFEST,
            MEDIA_TYPE_DOCKER_MANIFEST_LIST,
            MEDIA_TYPE_OCI_MANIFEST,
            MEDIA_TYPE_OCI_INDEX,
        ]
        .join(", ");

        let response = self
            .send(
                |c| c.head(url.clone()).header(ACCEPT, accept.as_str()),
                &scope,
                "manifest lookup",
            )
            .await?;
        let response = Self::check_status(response, "manifest lookup").await?;
        let headers = response.headers();

        let digest = headers
            .get(DOCKER_CONTENT_DIGEST)
            .and_then(|h| h.to_str().ok())
            .map(|s| s.trim().to_string())
            .ok_or_else(|| {
                RegistryError::Registry(format!(
                    "No {} header for {}:{}",
                    DOCKER_CONTENT_DIGEST, repository, reference
                ))
            })?;
        let media_type = headers
            .get(CONTENT_TYPE)
            .and_then(|h| h.to_str().ok())
            .map(|s| s.split(';').next().unwrap_or(s).trim().to_string())
            .unwrap_or_default();

        Ok(Descriptor { digest, media_type })
    }

    async fn delete_by_digest(&self, repository: &str, digest: &str) -> Result<()> {
        let scope = format!("repository:{}:delete", repository);
        let url = self.endpoint(&format!("{}/manifests/{}", repository, digest))?;
        self.output
            .verbose(&format!("Deleting manifest {}@{}", repository, digest));

        let response = self
            .send(|c| c.delete(url.clone()), &scope, "manifest deletion")
            .await?;
        Self::check_status(response, "manifest deletion").await?;
        Ok(())
    }
}

fn next_link(response: &Response) -> Option<String> {
    response
        .headers()
        .get(LINK)
        .and_then(|h| h.to_str().ok())
        .and_then(parse_next_link)
}

/// Extract the target of `rel="next"` from a `Link` header
pub fn parse_next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|part| {
        let (target, params) = part.split_once(';')?;
        let is_next = params
            .split(';')
            .any(|p| p.trim().replace(' ', "") == "rel=\"next\"" || p.trim() == "rel=next");
        if !is_next {
            return None;
        }
        let target = target.trim();
        target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(|t| t.to_string())
    })
}
