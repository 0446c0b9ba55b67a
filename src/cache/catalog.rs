//! Repository catalog cache
//!
//! The repository list is held as an immutable snapshot behind a lock and
//! replaced wholesale, so readers always see either the previous or the new
//! list, never a partially built one.

use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock};

/// What a catalog commit did to the cached list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogCommit {
    /// The list was replaced
    Replaced { repositories: usize },
    /// The fetch came back empty; the previous list was kept
    EmptyIgnored { kept: usize },
}

#[derive(Debug, Default)]
struct CatalogState {
    repositories: Arc<Vec<String>>,
    ready: bool,
}

#[derive(Debug, Default)]
pub struct CatalogCache {
    state: RwLock<CatalogState>,
}

impl CatalogCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current repository list. Cheap to call; the snapshot stays valid while
    /// the cache moves on.
    pub fn repositories(&self) -> Arc<Vec<String>> {
        Arc::clone(&self.state.read().unwrap_or_else(PoisonError::into_inner).repositories)
    }

    pub fn len(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .repositories
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True once a catalog fetch has completed successfully. Never reverts.
    pub fn is_ready(&self) -> bool {
        self.state.read().unwrap_or_else(PoisonError::into_inner).ready
    }

    /// Commit the result of a successful full catalog fetch.
    ///
    /// An empty result never overwrites the list, but still marks the cache
    /// ready.
    pub fn commit(&self, repositories: Vec<String>) -> CatalogCommit {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.ready = true;
        if repositories.is_empty() {
            return CatalogCommit::EmptyIgnored {
                kept: state.repositories.len(),
            };
        }
        let count = repositories.len();
        state.repositories = Arc::new(repositories);
        CatalogCommit::Replaced {
            repositories: count,
        }
    }

    /// Child names directly below `path` and whether `path` itself is a
    /// repository. The empty path lists top-level names.
    pub fn children(&self, path: &str) -> (Vec<String>, bool) {
        let path = path.trim_matches('/');
        let repositories = self.repositories();
        let mut names = BTreeSet::new();
        let mut is_repository = false;

        for repository in repositories.iter() {
            let rest = if path.is_empty() {
                Some(repository.as_str())
            } else {
                if repository == path {
                    is_repository = true;
                }
                repository
                    .strip_prefix(path)
                    .and_then(|r| r.strip_prefix('/'))
            };
            if let Some(first) = rest.and_then(|r| r.split('/').next()) {
                if !first.is_empty() {
                    names.insert(first.to_string());
                }
            }
        }

        (names.into_iter().collect(), is_repository)
    }
}
