//! Runs one CLI command against a freshly built metadata cache

use crate::cli::args::{Args, Command};
use crate::config::AppConfig;
use crate::error::{RegistryError, Result};
use crate::logging::Logger;
use crate::registry::RegistryClientBuilder;
use crate::sync::{MetadataCache, Scheduler, ShutdownSignal, Statistics, TagListing};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

pub struct Runner {
    args: Args,
    config: AppConfig,
    output: Logger,
}

#[derive(Serialize)]
struct BrowseEntry {
    name: String,
    path: String,
    tag_count: usize,
}

impl Runner {
    pub fn new(args: Args) -> Result<Self> {
        let config = args.apply_to(AppConfig::from_env());
        config.validate()?;

        let output = if config.quiet {
            Logger::new_quiet()
        } else {
            Logger::new(config.verbose)
        };

        Ok(Self {
            args,
            config,
            output,
        })
    }

    pub async fn run(&self) -> Result<()> {
        let cache = Arc::new(self.build_cache()?);

        match &self.args.command {
            Command::Watch { report_every } => self.watch(cache, *report_every).await,
            Command::Stats { top } => {
                cache.refresh_catalog().await?;
                cache.refresh_all_tags(&mut ShutdownSignal::never()).await;
                self.print_statistics(&cache.statistics(*top))
            }
            Command::Browse { path } => self.browse(&cache, path).await,
            Command::Tags { repository } => self.tags(&cache, repository).await,
            Command::Delete { repository, tag } => {
                if cache.delete_tag(repository, tag).await {
                    Ok(())
                } else {
                    Err(RegistryError::Registry(format!(
                        "Tag {}:{} was not deleted",
                        repository, tag
                    )))
                }
            }
        }
    }

    fn build_cache(&self) -> Result<MetadataCache> {
        let client = RegistryClientBuilder::from_config(&self.config.registry)?
            .with_logger(self.output.clone())
            .build()?;

        self.output.verbose(&format!(
            "Registry: {} (catalog every {} min, tags every {} min, online max {})",
            client.address(),
            self.config.refresh.catalog_refresh_interval,
            self.config.refresh.tags_async_refresh_interval,
            self.config.refresh.tags_online_refresh_max_count
        ));

        Ok(MetadataCache::new(Arc::new(client), self.config.refresh.clone())
            .with_logger(self.output.clone()))
    }

    async fn watch(&self, cache: Arc<MetadataCache>, report_every: u64) -> Result<()> {
        self.output.section("Registry Catalog Cache");
        let mut scheduler = Scheduler::start(Arc::clone(&cache));
        let mut report = tokio::time::interval(Duration::from_secs(report_every.max(1)));
        let mut running = true;

        loop {
            tokio::select! {
                finished = scheduler.wait(), if running => {
                    finished?;
                    running = false;
                    self.output.info("Background refresh finished, serving cached data until Ctrl-C.");
                }
                _ = tokio::signal::ctrl_c() => {
                    self.output.info("Shutting down background jobs...");
                    return scheduler.shutdown().await;
                }
                _ = report.tick() => {
                    if cache.is_catalog_ready() {
                        self.print_statistics(&cache.statistics(10))?;
                    }
                }
            }
        }
    }

    async fn browse(&self, cache: &MetadataCache, path: &str) -> Result<()> {
        cache.refresh_catalog().await?;
        let (children, is_repository) = cache.catalog().children(path);
        cache.refresh_all_tags(&mut ShutdownSignal::never()).await;

        let counts = cache.subtree_tag_counts(path, &children);
        let prefix = path.trim_matches('/');
        let entries: Vec<BrowseEntry> = children
            .iter()
            .map(|name| {
                let full = if prefix.is_empty() {
                    name.clone()
                } else {
                    format!("{}/{}", prefix, name)
                };
                BrowseEntry {
                    name: name.clone(),
                    tag_count: counts.get(&full).copied().unwrap_or(0),
                    path: full,
                }
            })
            .collect();

        if self.args.json {
            println!("{}", serde_json::to_string_pretty(&entries)?);
            return Ok(());
        }

        let title = if prefix.is_empty() { "/" } else { prefix };
        let lines: Vec<String> = entries
            .iter()
            .map(|e| format!("{} ({} tags)", e.name, e.tag_count))
            .collect();
        print_list(title, &lines);
        if is_repository {
            println!("\n{} is a repository, use `tags {}` to list its tags.", prefix, prefix);
        }
        Ok(())
    }

    async fn tags(&self, cache: &MetadataCache, repository: &str) -> Result<()> {
        cache.refresh_catalog().await?;
        let listing = load_tags(cache, repository).await;

        if self.args.json {
            println!("{}", serde_json::to_string_pretty(&listing)?);
            return Ok(());
        }

        if !listing.ready {
            self.output
                .warning(&format!("Tags for {} are not cached yet.", repository));
        }
        print_list(repository, &listing.tags);
        println!(
            "\n{}",
            cache.policy().describe_tag_refresh(listing.tags.len())
        );
        Ok(())
    }

    fn print_statistics(&self, stats: &Statistics) -> Result<()> {
        if self.args.json {
            println!("{}", serde_json::to_string_pretty(stats)?);
            return Ok(());
        }

        let job = |info: Option<crate::cache::JobInfo>| match info {
            Some(info) => format!(
                "{} ago, took {}",
                Logger::format_duration(info.age()),
                Logger::format_duration(info.duration)
            ),
            None => "never".to_string(),
        };

        println!("\nRegistry statistics");
        println!("  Catalog ready: {}", stats.catalog_ready);
        println!("  Repositories: {}", stats.repository_count);
        println!("  Tags: {}", stats.tag_count);
        println!("  Catalog job: {}", job(stats.catalog_job));
        println!("  Tags job: {}", job(stats.tags_job));

        let top: Vec<String> = stats
            .top_repositories
            .iter()
            .map(|r| format!("{} ({} tags)", r.repository, r.count))
            .collect();
        print_list("Top repositories", &top);
        Ok(())
    }
}

/// Tags of one repository for a process whose tags cache starts empty. An
/// uncached repository is fetched once; a cached one goes through the
/// refresh policy.
async fn load_tags(cache: &MetadataCache, repository: &str) -> TagListing {
    if cache.tags().contains(repository) {
        return cache.list_tags(repository).await;
    }
    match cache.fetch_and_cache_single(repository).await {
        Some(tags) => TagListing { tags, ready: true },
        None => TagListing::default(),
    }
}

// Results go to stdout even in quiet mode
fn print_list(title: &str, items: &[String]) {
    println!("\n--- {} ---", title);
    for (i, item) in items.iter().enumerate() {
        println!("  {}. {}", i + 1, item);
    }
    if items.is_empty() {
        println!("  (No items to display)");
    }
}
