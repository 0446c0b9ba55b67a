#![allow(dead_code)]

use async_trait::async_trait;
use registry_catalog_cache::error::{RegistryError, Result};
use registry_catalog_cache::registry::{CatalogPage, Descriptor, MEDIA_TYPE_OCI_MANIFEST, RegistryApi};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// In-memory registry that records every call it receives
#[derive(Default)]
pub struct FakeRegistry {
    state: Mutex<FakeState>,
}

#[derive(Default)]
struct FakeState {
    catalog_pages: Vec<Vec<String>>,
    catalog_fails: bool,
    /// Every page points back at the first one
    catalog_cursor_stuck: bool,
    /// repository -> [(tag, digest)]
    tags: HashMap<String, Vec<(String, String)>>,
    failing_repos: HashSet<String>,
    resolve_fails: bool,
    delete_fails: bool,
    catalog_page_calls: usize,
    list_tags_calls: HashMap<String, usize>,
    deleted_digests: Vec<(String, String)>,
}

impl FakeRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_catalog_pages(&self, pages: &[&[&str]]) {
        let mut state = self.state.lock().unwrap();
        state.catalog_pages = pages
            .iter()
            .map(|page| page.iter().map(|s| s.to_string()).collect())
            .collect();
    }

    pub fn set_catalog_cursor_stuck(&self, stuck: bool) {
        self.state.lock().unwrap().catalog_cursor_stuck = stuck;
    }

    pub fn set_catalog_fails(&self, fails: bool) {
        self.state.lock().unwrap().catalog_fails = fails;
    }

    /// Tags with a distinct digest each
    pub fn set_tags(&self, repository: &str, tags: &[&str]) {
        let entries = tags
            .iter()
            .map(|t| (t.to_string(), format!("sha256:{}-{}", repository, t)))
            .collect();
        self.state
            .lock()
            .unwrap()
            .tags
            .insert(repository.to_string(), entries);
    }

    pub fn set_tag_count(&self, repository: &str, count: usize) {
        let names: Vec<String> = (0..count).map(|i| format!("v{}", i)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        self.set_tags(repository, &refs);
    }

    pub fn set_tags_with_digests(&self, repository: &str, tags: &[(&str, &str)]) {
        let entries = tags
            .iter()
            .map(|(t, d)| (t.to_string(), d.to_string()))
            .collect();
        self.state
            .lock()
            .unwrap()
            .tags
            .insert(repository.to_string(), entries);
    }

    pub fn fail_repository(&self, repository: &str, fails: bool) {
        let mut state = self.state.lock().unwrap();
        if fails {
            state.failing_repos.insert(repository.to_string());
        } else {
            state.failing_repos.remove(repository);
        }
    }

    pub fn set_resolve_fails(&self, fails: bool) {
        self.state.lock().unwrap().resolve_fails = fails;
    }

    pub fn set_delete_fails(&self, fails: bool) {
        self.state.lock().unwrap().delete_fails = fails;
    }

    pub fn catalog_page_calls(&self) -> usize {
        self.state.lock().unwrap().catalog_page_calls
    }

    pub fn list_tags_calls(&self, repository: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .list_tags_calls
            .get(repository)
            .copied()
            .unwrap_or(0)
    }

    pub fn server_tags(&self, repository: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .tags
            .get(repository)
            .map(|entries| entries.iter().map(|(t, _)| t.clone()).collect())
            .unwrap_or_default()
    }

    pub fn deleted_digests(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().deleted_digests.clone()
    }
}

#[async_trait]
impl RegistryApi for FakeRegistry {
    async fn list_catalog_page(&self, cursor: Option<&str>) -> Result<CatalogPage> {
        let mut state = self.state.lock().unwrap();
        state.catalog_page_calls += 1;
        if state.catalog_fails {
            return Err(RegistryError::Network("connection refused".to_string()));
        }

        let index: usize = match cursor {
            Some(cursor) => cursor
                .parse()
                .map_err(|_| RegistryError::Parse(format!("bad cursor {}", cursor)))?,
            None => 0,
        };
        let repositories = state.catalog_pages.get(index).cloned().unwrap_or_default();
        let next = if state.catalog_cursor_stuck {
            Some("0".to_string())
        } else {
            (index + 1 < state.catalog_pages.len()).then(|| (index + 1).to_string())
        };
        Ok(CatalogPage::new(repositories, next))
    }

    async fn list_tags(&self, repository: &str) -> Result<Vec<String>> {
        let mut state = self.state.lock().unwrap();
        *state
            .list_tags_calls
            .entry(repository.to_string())
            .or_insert(0) += 1;
        if state.failing_repos.contains(repository) {
            return Err(RegistryError::Registry(format!("tags of {} unavailable", repository)));
        }
        state
            .tags
            .get(repository)
            .map(|entries| entries.iter().map(|(t, _)| t.clone()).collect())
            .ok_or_else(|| RegistryError::NotFound(repository.to_string()))
    }

    async fn resolve_descriptor(&self, repository: &str, reference: &str) -> Result<Descriptor> {
        let state = self.state.lock().unwrap();
        if state.resolve_fails {
            return Err(RegistryError::Timeout("manifest lookup".to_string()));
        }
        state
            .tags
            .get(repository)
            .and_then(|entries| entries.iter().find(|(t, _)| t == reference))
            .map(|(_, digest)| Descriptor {
                digest: digest.clone(),
                media_type: MEDIA_TYPE_OCI_MANIFEST.to_string(),
            })
            .ok_or_else(|| RegistryError::NotFound(format!("{}:{}", repository, reference)))
    }

    async fn delete_by_digest(&self, repository: &str, digest: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.delete_fails {
            return Err(RegistryError::Registry("deletion disabled".to_string()));
        }
        if let Some(entries) = state.tags.get_mut(repository) {
            entries.retain(|(_, d)| d != digest);
        }
        state
            .deleted_digests
            .push((repository.to_string(), digest.to_string()));
        Ok(())
    }
}
