//! Per-repository tag cache and the aggregates derived from it
//!
//! A repository is present only after its tags were fetched at least once;
//! absence means "unknown", not "no tags". Every read takes the shared lock
//! and every write the exclusive one. Aggregates hold the shared lock for the
//! whole scan so they never mix two generations of the map.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Repository with its cached tag count
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoTagCount {
    pub repository: String,
    pub count: usize,
}

#[derive(Debug, Default)]
pub struct TagsCache {
    entries: RwLock<HashMap<String, Vec<String>>>,
}

impl TagsCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Vec<String>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Vec<String>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, repository: &str) -> Option<Vec<String>> {
        self.read().get(repository).cloned()
    }

    pub fn tag_count(&self, repository: &str) -> Option<usize> {
        self.read().get(repository).map(Vec::len)
    }

    pub fn contains(&self, repository: &str) -> bool {
        self.read().contains_key(repository)
    }

    /// Number of repositories with a cached entry
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn insert(&self, repository: &str, tags: Vec<String>) {
        self.write().insert(repository.to_string(), tags);
    }

    /// Drop `tag` from a cached repository. Returns false when the repository
    /// is not cached or did not list the tag.
    pub fn remove_tag(&self, repository: &str, tag: &str) -> bool {
        let mut entries = self.write();
        match entries.get_mut(repository) {
            Some(tags) => {
                let before = tags.len();
                tags.retain(|t| t != tag);
                tags.len() != before
            }
            None => false,
        }
    }

    /// Sum of cached tag list lengths
    pub fn total_tag_count(&self) -> usize {
        self.read().values().map(Vec::len).sum()
    }

    /// Cached repositories ordered by tag count, largest first, at most `n`.
    /// Equal counts come out in no particular order.
    pub fn top_by_tag_count(&self, n: usize) -> Vec<RepoTagCount> {
        let mut result: Vec<RepoTagCount> = self
            .read()
            .iter()
            .map(|(repository, tags)| RepoTagCount {
                repository: repository.clone(),
                count: tags.len(),
            })
            .collect();

        result.sort_unstable_by(|a, b| b.count.cmp(&a.count));
        result.truncate(n);
        result
    }

    /// Tag counts of each candidate subtree under `prefix`: every cached
    /// repository equal to `prefix/candidate` or nested below it contributes.
    /// Keys are the full subtree paths; subtrees with no cached repository
    /// are left out.
    pub fn subtree_tag_counts<S: AsRef<str>>(
        &self,
        prefix: &str,
        candidates: &[S],
    ) -> HashMap<String, usize> {
        let prefix = prefix.trim_matches('/');
        let mut counts = HashMap::new();

        for candidate in candidates {
            let subtree = if prefix.is_empty() {
                candidate.as_ref().to_string()
            } else {
                format!("{}/{}", prefix, candidate.as_ref())
            };
            let nested = format!("{}/", subtree);

            let entries = self.read();
            for (repository, tags) in entries.iter() {
                if *repository == subtree || repository.starts_with(&nested) {
                    *counts.entry(subtree.clone()).or_insert(0) += tags.len();
                }
            }
        }
        counts
    }
}
