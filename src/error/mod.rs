//! Error types and handlers for registry and cache operations

pub mod handlers;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RegistryError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Network related errors
    #[error("Network error: {0}")]
    Network(String),
    /// Registry responded with an error status
    #[error("Registry error: {0}")]
    Registry(String),
    /// Authentication errors
    #[error("Authentication error: {0}")]
    Auth(String),
    /// Response decoding errors
    #[error("Parse error: {0}")]
    Parse(String),
    /// Invalid configuration or arguments
    #[error("Validation error: {0}")]
    Validation(String),
    /// Request exceeded the client timeout
    #[error("Timeout: {0}")]
    Timeout(String),
    /// Repository, tag or manifest does not exist
    #[error("Not found: {0}")]
    NotFound(String),
    /// File IO errors
    #[error("IO error: {0}")]
    Io(String),
    /// The first catalog fetch failed, nothing can be served
    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(String),
}

impl From<std::io::Error> for RegistryError {
    fn from(err: std::io::Error) -> Self {
        RegistryError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        RegistryError::Parse(err.to_string())
    }
}

impl From<reqwest::Error> for RegistryError {
    fn from(err: reqwest::Error) -> Self {
        handlers::NetworkErrorHandler::handle_network_error(&err, "request")
    }
}

impl From<url::ParseError> for RegistryError {
    fn from(err: url::ParseError) -> Self {
        RegistryError::Validation(err.to_string())
    }
}
