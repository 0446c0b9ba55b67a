//! Standardized mapping of HTTP and transport failures to [`RegistryError`]

use crate::error::RegistryError;
use reqwest::StatusCode;

/// Standard error handler for HTTP responses
pub struct HttpErrorHandler;

impl HttpErrorHandler {
    /// Handle registry-related HTTP errors
    pub fn handle_registry_error(
        status: StatusCode,
        error_text: &str,
        operation: &str,
    ) -> RegistryError {
        match status.as_u16() {
            401 => RegistryError::Auth(format!(
                "Unauthorized to perform {} operation: {}",
                operation, error_text
            )),
            403 => RegistryError::Auth(format!(
                "Forbidden: insufficient permissions for {}: {}",
                operation, error_text
            )),
            404 => RegistryError::NotFound(format!(
                "Resource not found for {}: {}",
                operation, error_text
            )),
            405 => RegistryError::Registry(format!(
                "Operation {} not allowed by registry (is deletion enabled?): {}",
                operation, error_text
            )),
            429 => RegistryError::Registry(format!(
                "Rate limited during {}: {}",
                operation, error_text
            )),
            500 => RegistryError::Registry(format!(
                "Registry server error during {}: {}",
                operation, error_text
            )),
            502 | 503 => RegistryError::Registry(format!(
                "Registry unavailable for {}: {}",
                operation, error_text
            )),
            504 => RegistryError::Timeout(format!(
                "Gateway timeout during {}: {}",
                operation, error_text
            )),
            _ => RegistryError::Registry(format!(
                "{} failed (status {}): {}",
                operation, status, error_text
            )),
        }
    }
}

/// Network error categorization and handling
pub struct NetworkErrorHandler;

impl NetworkErrorHandler {
    /// Categorize and format network errors with helpful context
    pub fn handle_network_error(error: &reqwest::Error, context: &str) -> RegistryError {
        if error.is_timeout() {
            RegistryError::Timeout(format!("{} timeout: {}", context, error))
        } else if error.is_connect() {
            RegistryError::Network(format!("Connection error during {}: {}", context, error))
        } else if error.is_decode() {
            RegistryError::Parse(format!("Invalid response body for {}: {}", context, error))
        } else if error.to_string().contains("dns") {
            RegistryError::Network(format!("DNS resolution error for {}: {}", context, error))
        } else if error.to_string().contains("certificate") {
            RegistryError::Network(format!(
                "TLS certificate error during {}: {}",
                context, error
            ))
        } else {
            RegistryError::Network(format!("{} network error: {}", context, error))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let err = HttpErrorHandler::handle_registry_error(StatusCode::NOT_FOUND, "gone", "tag listing");
        assert!(matches!(err, RegistryError::NotFound(_)));

        let err = HttpErrorHandler::handle_registry_error(StatusCode::UNAUTHORIZED, "", "catalog");
        assert!(matches!(err, RegistryError::Auth(_)));

        let err = HttpErrorHandler::handle_registry_error(
            StatusCode::METHOD_NOT_ALLOWED,
            "UNSUPPORTED",
            "manifest deletion",
        );
        assert!(err.to_string().contains("deletion enabled"));

        let err = HttpErrorHandler::handle_registry_error(StatusCode::IM_A_TEAPOT, "?", "catalog");
        assert!(matches!(err, RegistryError::Registry(msg) if msg.contains("418")));
    }
}
