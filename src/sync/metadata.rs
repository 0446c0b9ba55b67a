//! Registry metadata cache
//!
//! [`MetadataCache`] owns the catalog and tag caches together with the
//! registry client that fills them. It is built once at startup, shared as
//! `Arc<MetadataCache>` between the refresh loops and the readers, and
//! absorbs every registry failure at its boundary: callers see a ready flag,
//! an empty result or `false`, never an error. The one exception is the very
//! first catalog fetch, see [`MetadataCache::refresh_catalog`].

use crate::cache::{CatalogCache, CatalogCommit, JobInfo, JobTracker, RepoTagCount, TagsCache};
use crate::config::RefreshPolicy;
use crate::error::{RegistryError, Result};
use crate::logging::Logger;
use crate::registry::{RegistryApi, advance_cursor};
use crate::sync::decision::{TagSource, choose_tag_source};
use crate::sync::shutdown::ShutdownSignal;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::Instant;

/// Result of one catalog refresh that did not fail fatally
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogRefresh {
    Committed(CatalogCommit),
    /// The fetch failed after the cache was ready; previous list kept
    KeptStale,
}

/// Tags of one repository as handed to the presentation layer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TagListing {
    pub tags: Vec<String>,
    /// False when nothing usable is known for the repository yet
    pub ready: bool,
}

impl TagListing {
    fn ready(tags: Vec<String>) -> Self {
        Self { tags, ready: true }
    }

    fn not_ready() -> Self {
        Self::default()
    }
}

/// Outcome of one pass over all catalog repositories
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TagsPass {
    pub refreshed: usize,
    pub failed: usize,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    pub catalog_ready: bool,
    pub repository_count: usize,
    pub tag_count: usize,
    pub top_repositories: Vec<RepoTagCount>,
    pub catalog_job: Option<JobInfo>,
    pub tags_job: Option<JobInfo>,
}

pub struct MetadataCache {
    client: Arc<dyn RegistryApi>,
    policy: RefreshPolicy,
    catalog: CatalogCache,
    tags: TagsCache,
    catalog_job: JobTracker,
    tags_job: JobTracker,
    output: Logger,
    catalog_log: Logger,
    tags_log: Logger,
}

impl MetadataCache {
    pub fn new(client: Arc<dyn RegistryApi>, policy: RefreshPolicy) -> Self {
        Self {
            client,
            policy,
            catalog: CatalogCache::new(),
            tags: TagsCache::new(),
            catalog_job: JobTracker::new(),
            tags_job: JobTracker::new(),
            output: Logger::default(),
            catalog_log: Logger::default(),
            tags_log: Logger::default(),
        }
        .with_logger(Logger::default())
    }

    pub fn with_logger(mut self, output: Logger) -> Self {
        self.catalog_log = output.with_component("RefreshCatalog");
        self.tags_log = output.with_component("RefreshTags");
        self.output = output.with_component("registry.cache");
        self
    }

    pub fn policy(&self) -> &RefreshPolicy {
        &self.policy
    }

    pub fn catalog(&self) -> &CatalogCache {
        &self.catalog
    }

    pub fn tags(&self) -> &TagsCache {
        &self.tags
    }

    pub(crate) fn catalog_logger(&self) -> &Logger {
        &self.catalog_log
    }

    pub(crate) fn tags_logger(&self) -> &Logger {
        &self.tags_log
    }

    pub fn repositories(&self) -> Arc<Vec<String>> {
        self.catalog.repositories()
    }

    pub fn is_catalog_ready(&self) -> bool {
        self.catalog.is_ready()
    }

    /// Walk every catalog page; nothing is committed unless all pages arrive.
    async fn fetch_catalog(&self) -> Result<Vec<String>> {
        let mut repositories = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = self.client.list_catalog_page(cursor.as_deref()).await?;
            self.catalog_log.debug(&format!(
                "Repo batch received: {} repositories",
                page.repositories.len()
            ));
            repositories.extend(page.repositories);

            match advance_cursor(cursor.as_deref(), page.next, "Catalog")? {
                Some(next) => cursor = Some(next),
                None => return Ok(repositories),
            }
        }
    }

    /// Fetch the full catalog and commit it.
    ///
    /// A failure before the catalog was ever ready is returned as
    /// [`RegistryError::CatalogUnavailable`]: there is nothing to serve and the
    /// process should stop. Later failures keep the previous list.
    pub async fn refresh_catalog(&self) -> Result<CatalogRefresh> {
        let start = Instant::now();
        self.catalog_log.info("Started reading catalog...");

        let repositories = match self.fetch_catalog().await {
            Ok(repositories) => repositories,
            Err(e) => {
                self.catalog_log
                    .error(&format!("Error fetching catalog: {}", e));
                if !self.catalog.is_ready() {
                    return Err(RegistryError::CatalogUnavailable(e.to_string()));
                }
                return Ok(CatalogRefresh::KeptStale);
            }
        };

        let commit = self.catalog.commit(repositories);
        if let CatalogCommit::EmptyIgnored { .. } = commit {
            self.catalog_log
                .warning("Catalog looks empty, preserving previous list if any.");
        }

        let info = JobInfo::finished_now(start.elapsed());
        self.catalog_job.record(info);
        self.catalog_log.info(&format!(
            "Job complete ({}): {} repos found",
            Logger::format_duration(info.duration),
            self.catalog.len()
        ));
        Ok(CatalogRefresh::Committed(commit))
    }

    /// Fetch one repository's tags and replace its cache entry.
    ///
    /// `None` means the fetch failed and the cache entry was left as it was;
    /// it does not mean the repository has no tags.
    pub async fn fetch_and_cache_single(&self, repository: &str) -> Option<Vec<String>> {
        match self.client.list_tags(repository).await {
            Ok(tags) => {
                self.tags.insert(repository, tags.clone());
                self.output
                    .debug(&format!("Cached {} tags for repo {}", tags.len(), repository));
                Some(tags)
            }
            Err(e) => {
                self.output
                    .error(&format!("Error listing tags for repo {}: {}", repository, e));
                None
            }
        }
    }

    /// Refresh every repository currently in the catalog, one at a time.
    ///
    /// Individual failures are logged and skipped. The job info is recorded
    /// only for passes that ran to the end.
    pub async fn refresh_all_tags(&self, shutdown: &mut ShutdownSignal) -> TagsPass {
        let start = Instant::now();
        let repositories = self.catalog.repositories();
        let mut pass = TagsPass::default();
        self.tags_log
            .info("Started caching tags for all repositories...");

        for repository in repositories.iter() {
            let fetched = tokio::select! {
                biased;
                _ = shutdown.wait() => {
                    pass.cancelled = true;
                    break;
                }
                fetched = self.fetch_and_cache_single(repository) => fetched,
            };
            match fetched {
                Some(_) => pass.refreshed += 1,
                None => pass.failed += 1,
            }
        }

        if pass.cancelled {
            self.tags_log.warning(&format!(
                "Pass cancelled after {} of {} repositories",
                pass.refreshed + pass.failed,
                repositories.len()
            ));
            return pass;
        }

        let info = JobInfo::finished_now(start.elapsed());
        self.tags_job.record(info);
        self.tags_log.info(&format!(
            "Job complete ({}): {} repos refreshed, {} failed",
            Logger::format_duration(info.duration),
            pass.refreshed,
            pass.failed
        ));
        pass
    }

    /// Tags for one repository, from the cache or the registry depending on
    /// the refresh policy (see [`choose_tag_source`]).
    pub async fn list_tags(&self, repository: &str) -> TagListing {
        let cached = self.tags.get(repository);
        match choose_tag_source(&self.policy, cached.as_ref().map(Vec::len)) {
            TagSource::Online => match self.fetch_and_cache_single(repository).await {
                Some(tags) => TagListing::ready(tags),
                None => TagListing::not_ready(),
            },
            TagSource::Cached => TagListing::ready(cached.unwrap_or_default()),
            TagSource::NotReady => TagListing::not_ready(),
        }
    }

    pub fn total_tag_count(&self) -> usize {
        self.tags.total_tag_count()
    }

    pub fn top_repositories_by_tag_count(&self, n: usize) -> Vec<RepoTagCount> {
        self.tags.top_by_tag_count(n)
    }

    pub fn subtree_tag_counts<S: AsRef<str>>(
        &self,
        prefix: &str,
        candidates: &[S],
    ) -> HashMap<String, usize> {
        self.tags.subtree_tag_counts(prefix, candidates)
    }

    /// Latest (catalog, tags) job runs
    pub fn job_info(&self) -> (Option<JobInfo>, Option<JobInfo>) {
        (self.catalog_job.latest(), self.tags_job.latest())
    }

    pub fn statistics(&self, top_n: usize) -> Statistics {
        let (catalog_job, tags_job) = self.job_info();
        Statistics {
            catalog_ready: self.is_catalog_ready(),
            repository_count: self.catalog.len(),
            tag_count: self.total_tag_count(),
            top_repositories: self.top_repositories_by_tag_count(top_n),
            catalog_job,
            tags_job,
        }
    }

    /// Delete `repository:tag` on the registry and drop the tag locally.
    ///
    /// The registry deletes by digest, which removes every tag pointing at
    /// the same manifest. Only the requested tag is removed from the cache;
    /// its siblings stay listed until the repository is refreshed again.
    /// Returns false, with the cache untouched, if any step failed.
    pub async fn delete_tag(&self, repository: &str, tag: &str) -> bool {
        let image_ref = format!("{}:{}", repository, tag);

        let descriptor = match self.client.resolve_descriptor(repository, tag).await {
            Ok(descriptor) => descriptor,
            Err(e) => {
                self.output
                    .error(&format!("Error fetching image reference {}: {}", image_ref, e));
                return false;
            }
        };

        if descriptor.is_index() {
            self.output.verbose(&format!(
                "{} is a multi-platform index, its platform manifests go with it",
                image_ref
            ));
        }

        if let Err(e) = self
            .client
            .delete_by_digest(repository, &descriptor.digest)
            .await
        {
            self.output
                .error(&format!("Error deleting image {}: {}", image_ref, e));
            return false;
        }

        self.tags.remove_tag(repository, tag);
        self.output.success(&format!(
            "Image {} ({}) has been successfully deleted.",
            image_ref, descriptor.digest
        ));
        true
    }
}
