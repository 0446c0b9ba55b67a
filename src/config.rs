//! Configuration management module

use crate::error::{RegistryError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ENV_PREFIX: &str = "REGISTRY_CACHE_";

/// Refresh policy for the catalog and tag caches.
///
/// Intervals are in minutes. An interval of 0 has its own meaning per job:
/// the catalog is fetched once and never again, while background tag refresh
/// is never started (every tag listing then goes to the registry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshPolicy {
    pub catalog_refresh_interval: u64,
    pub tags_async_refresh_interval: u64,
    /// Cached repositories with at most this many tags are refreshed on every
    /// listing. 0 turns online refresh off.
    pub tags_online_refresh_max_count: usize,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            catalog_refresh_interval: 10,
            tags_async_refresh_interval: 60,
            tags_online_refresh_max_count: 100,
        }
    }
}

impl RefreshPolicy {
    pub fn new(catalog_minutes: u64, tags_minutes: u64, online_max_count: usize) -> Self {
        Self {
            catalog_refresh_interval: catalog_minutes,
            tags_async_refresh_interval: tags_minutes,
            tags_online_refresh_max_count: online_max_count,
        }
    }

    /// `None` means one-shot mode
    pub fn catalog_interval(&self) -> Option<Duration> {
        minutes(self.catalog_refresh_interval)
    }

    /// `None` means the background tag refresh never runs
    pub fn tags_interval(&self) -> Option<Duration> {
        minutes(self.tags_async_refresh_interval)
    }

    pub fn background_tags_enabled(&self) -> bool {
        self.tags_async_refresh_interval > 0
    }

    /// Human readable note on how fresh a tag list of `tag_count` entries is
    pub fn describe_tag_refresh(&self, tag_count: usize) -> String {
        let interval = self.tags_async_refresh_interval;
        let max_count = self.tags_online_refresh_max_count;
        if interval == 0 {
            "Tags for this repo are refreshed online when browsing.".to_string()
        } else if max_count == 0 {
            format!(
                "Tags for this repo are refreshed in the background every {} min.",
                interval
            )
        } else if tag_count <= max_count {
            format!(
                "Tags for this repo are refreshed in the background every {} min and online when browsing.",
                interval
            )
        } else {
            format!(
                "Tags for this repo are refreshed in the background every {} min. Online refresh is disabled (tag count exceeds {}).",
                interval, max_count
            )
        }
    }
}

fn minutes(value: u64) -> Option<Duration> {
    (value > 0).then(|| Duration::from_secs(value.saturating_mul(60)))
}

/// Registry connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub address: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub password_file: Option<String>,
    pub skip_tls: bool,
    /// Per-request timeout in seconds
    pub timeout: u64,
    pub catalog_page_size: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            address: "http://localhost:5000".to_string(),
            username: None,
            password: None,
            password_file: None,
            skip_tls: false,
            timeout: 60,
            catalog_page_size: 100,
        }
    }
}

impl RegistryConfig {
    pub fn new(address: String) -> Self {
        Self {
            address,
            ..Self::default()
        }
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

    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn validate(&self) -> Result<()> {
        if self.address.is_empty() {
            return Err(RegistryError::Validation(
                "Registry address cannot be empty".to_string(),
            ));
        }

        if !self.address.starts_with("http://") && !self.address.starts_with("https://") {
            return Err(RegistryError::Validation(format!(
                "Invalid registry address: {}. Must start with http:// or https://",
                self.address
            )));
        }

        if self.timeout == 0 {
            return Err(RegistryError::Validation(
                "Timeout must be greater than 0".to_string(),
            ));
        }

        if self.catalog_page_size == 0 {
            return Err(RegistryError::Validation(
                "catalog_page_size must be greater than 0".to_string(),
            ));
        }

        if self.password.is_some() && self.username.is_none() {
            return Err(RegistryError::Validation(
                "Username is required when password is provided".to_string(),
            ));
        }

        Ok(())
    }

    /// Explicit password, or the content of the password file without its
    /// trailing newline.
    pub fn resolve_password(&self) -> Result<Option<String>> {
        if let Some(password) = self.password.as_ref().filter(|p| !p.is_empty()) {
            return Ok(Some(password.clone()));
        }
        match &self.password_file {
            Some(path) if !path.is_empty() => {
                let data = std::fs::read_to_string(path).map_err(|e| {
                    RegistryError::Validation(format!(
                        "Cannot read password file {}: {}",
                        path, e
                    ))
                })?;
                let password = data.strip_suffix('\n').unwrap_or(&data);
                Ok(Some(password.to_string()))
            }
            _ => Ok(None),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub registry: RegistryConfig,
    pub refresh: RefreshPolicy,
    pub verbose: bool,
    pub quiet: bool,
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        self.registry.validate()
    }

    /// Create config from environment variables and defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from any `REGISTRY_CACHE_*` key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));
        let mut config = Self::default();

        if let Some(val) = var("ADDRESS") {
            config.registry.address = val;
        }
        if let Some(val) = var("USERNAME") {
            config.registry.username = Some(val);
        }
        if let Some(val) = var("PASSWORD") {
            config.registry.password = Some(val);
        }
        if let Some(val) = var("PASSWORD_FILE") {
            config.registry.password_file = Some(val);
        }
        if let Some(val) = var("SKIP_TLS") {
            config.registry.skip_tls = is_truthy(&val);
        }
        if let Some(timeout) = var("TIMEOUT").and_then(|v| v.parse().ok()) {
            config.registry.timeout = timeout;
        }
        if let Some(size) = var("CATALOG_PAGE_SIZE").and_then(|v| v.parse().ok()) {
            config.registry.catalog_page_size = size;
        }
        if let Some(minutes) = var("CATALOG_INTERVAL").and_then(|v| v.parse().ok()) {
            config.refresh.catalog_refresh_interval = minutes;
        }
        if let Some(minutes) = var("TAGS_INTERVAL").and_then(|v| v.parse().ok()) {
            config.refresh.tags_async_refresh_interval = minutes;
        }
        if let Some(count) = var("TAGS_ONLINE_MAX").and_then(|v| v.parse().ok()) {
            config.refresh.tags_online_refresh_max_count = count;
        }
        if let Some(val) = var("VERBOSE") {
            config.verbose = is_truthy(&val);
        }

        config
    }
}

fn is_truthy(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_zero_intervals_disable() {
        let policy = RefreshPolicy::new(0, 0, 5);
        assert_eq!(policy.catalog_interval(), None);
        assert_eq!(policy.tags_interval(), None);
        assert!(!policy.background_tags_enabled());

        let policy = RefreshPolicy::new(2, 3, 5);
        assert_eq!(policy.catalog_interval(), Some(Duration::from_secs(120)));
        assert_eq!(policy.tags_interval(), Some(Duration::from_secs(180)));
    }

    #[test]
    fn test_huge_interval_saturates() {
        let policy = RefreshPolicy::new(u64::MAX, u64::MAX / 30, 5);
        assert_eq!(policy.catalog_interval(), Some(Duration::from_secs(u64::MAX)));
        assert_eq!(policy.tags_interval(), Some(Duration::from_secs(u64::MAX)));
    }

    #[test]
    fn test_describe_tag_refresh() {
        let online_only = RefreshPolicy::new(10, 0, 5);
        assert!(online_only.describe_tag_refresh(1000).contains("online when browsing"));

        let background_only = RefreshPolicy::new(10, 30, 0);
        assert_eq!(
            background_only.describe_tag_refresh(3),
            "Tags for this repo are refreshed in the background every 30 min."
        );

        let mixed = RefreshPolicy::new(10, 30, 5);
        assert!(mixed.describe_tag_refresh(5).ends_with("and online when browsing."));
        assert!(mixed.describe_tag_refresh(6).contains("tag count exceeds 5"));
    }

    #[test]
    fn test_registry_config_validation() {
        assert!(RegistryConfig::default().validate().is_ok());
        assert!(RegistryConfig::new("registry.local".to_string()).validate().is_err());
        assert!(
            RegistryConfig::new("https://registry.local".to_string())
                .with_timeout(0)
                .validate()
                .is_err()
        );
        assert!(
            RegistryConfig::default()
                .with_credentials(None, Some("secret".to_string()))
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("REGISTRY_CACHE_ADDRESS", "https://registry.example.com"),
            ("REGISTRY_CACHE_CATALOG_INTERVAL", "0"),
            ("REGISTRY_CACHE_TAGS_ONLINE_MAX", "25"),
            ("REGISTRY_CACHE_TIMEOUT", "not-a-number"),
            ("REGISTRY_CACHE_SKIP_TLS", "TRUE"),
        ]
        .into_iter()
        .collect();

        let config = AppConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.registry.address, "https://registry.example.com");
        assert_eq!(config.refresh.catalog_refresh_interval, 0);
        assert_eq!(config.refresh.tags_online_refresh_max_count, 25);
        assert_eq!(config.registry.timeout, RegistryConfig::default().timeout);
        assert!(config.registry.skip_tls);
    }

    #[test]
    fn test_resolve_password_from_file() {
        let path = std::env::temp_dir().join(format!(
            "registry-catalog-cache-password-{}",
            std::process::id()
        ));
        std::fs::write(&path, "s3cret\n").unwrap();

        let config = RegistryConfig {
            username: Some("admin".to_string()),
            password_file: Some(path.to_string_lossy().to_string()),
            ..RegistryConfig::default()
        };
        assert_eq!(config.resolve_password().unwrap(), Some("s3cret".to_string()));

        let explicit = config.clone().with_credentials(Some("admin".to_string()), Some("direct".to_string()));
        assert_eq!(explicit.resolve_password().unwrap(), Some("direct".to_string()));

        std::fs::remove_file(&path).unwrap();
        assert!(config.resolve_password().is_err());
    }
}
