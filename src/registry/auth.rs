//! Authentication module for Docker registry access
//!
//! Handles the registry's `WWW-Authenticate` challenge: Bearer challenges are
//! answered by requesting a token from the advertised realm (with basic
//! credentials when configured), Basic challenges by sending the credentials
//! directly. Tokens are kept per scope so a sweep over many repositories
//! does not hit the token service on every request.

use crate::error::{RegistryError, Result};
use crate::logging::Logger;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use url::Url;

/// Parsed `WWW-Authenticate` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthChallenge {
    Bearer {
        realm: String,
        service: Option<String>,
        scope: Option<String>,
    },
    Basic,
}

impl AuthChallenge {
    /// Parse `Bearer realm="...",service="...",scope="..."` or `Basic realm="..."`
    pub fn parse(header: &str) -> Option<Self> {
        let header = header.trim();
        let (scheme, params_str) = header.split_once(' ').unwrap_or((header, ""));

        if scheme.eq_ignore_ascii_case("basic") {
            return Some(AuthChallenge::Basic);
        }
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }

        let params = parse_params(params_str);
        let realm = params.get("realm")?.to_string();
        Some(AuthChallenge::Bearer {
            realm,
            service: params.get("service").map(|s| s.to_string()),
            scope: params.get("scope").map(|s| s.to_string()),
        })
    }
}

// Values may contain commas (`scope="repository:a:pull,push"`), so split on
// commas outside of quotes only.
fn parse_params(params_str: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in params_str.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            ',' if !in_quotes => {
                insert_param(&current, &mut params);
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    insert_param(&current, &mut params);
    params
}

fn insert_param(part: &str, params: &mut HashMap<String, String>) {
    if let Some((key, value)) = part.split_once('=') {
        params.insert(
            key.trim().to_ascii_lowercase(),
            value.trim().trim_matches('"').to_string(),
        );
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Option<String>,
    access_token: Option<String>,
}

#[derive(Clone)]
pub struct Auth {
    client: Client,
    username: Option<String>,
    password: Option<String>,
    tokens: Arc<RwLock<HashMap<String, String>>>,
    output: Logger,
}

impl Auth {
    pub fn new(
        client: Client,
        username: Option<String>,
        password: Option<String>,
        output: Logger,
    ) -> Self {
        Self {
            client,
            username,
            password,
            tokens: Arc::new(RwLock::new(HashMap::new())),
            output,
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.username.is_some()
    }

    /// Attach the cached token for `scope`, or basic credentials when no token
    /// has been issued yet.
    pub fn authorize(&self, request: RequestBuilder, scope: &str) -> RequestBuilder {
        let token = self
            .tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(scope)
            .cloned();

        match (token, &self.username) {
            (Some(token), _) => request.bearer_auth(token),
            (None, Some(username)) => request.basic_auth(username, self.password.as_ref()),
            (None, None) => request,
        }
    }

    /// Answer a challenge for requests keyed by `scope`. Returns whether a
    /// retry with [`Auth::authorize`] can succeed.
    pub async fn respond(&self, challenge: &AuthChallenge, scope: &str) -> Result<bool> {
        match challenge {
            AuthChallenge::Basic => Ok(self.has_credentials()),
            AuthChallenge::Bearer {
                realm,
                service,
                scope: challenge_scope,
            } => {
                let token = self
                    .request_token(realm, service.as_deref(), challenge_scope.as_deref())
                    .await?;
                self.tokens
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(scope.to_string(), token);
                Ok(true)
            }
        }
    }

    async fn request_token(
        &self,
        realm: &str,
        service: Option<&str>,
        scope: Option<&str>,
    ) -> Result<String> {
        let mut url = Url::parse(realm)?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(service) = service {
                query.append_pair("service", service);
            }
            if let Some(scope) = scope {
                query.append_pair("scope", scope);
            }
        }

        self.output
            .detail(&format!("Requesting token from: {}", url));

        let mut request = self.client.get(url);
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_ref());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            self.output.error(&format!(
                "Token request failed with status {}: {}",
                status, error_text
            ));
            return Err(RegistryError::Auth(format!(
                "Token request failed with status: {}",
                status
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| RegistryError::Parse(format!("Failed to parse token response: {}", e)))?;

        token_response
            .token
            .or(token_response.access_token)
            .ok_or_else(|| RegistryError::Auth("Token response contained no token".to_string()))
    }
}
