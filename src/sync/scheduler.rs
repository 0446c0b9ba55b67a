//! Background refresh loops
//!
//! The catalog loop refreshes the repository list every
//! `catalog_refresh_interval` minutes, or exactly once when the interval is 0.
//! After its first successful run it starts the tag loop, once, if
//! `tags_async_refresh_interval` is above 0. Both loops sleep on tokio's timer
//! and stop when the scheduler shuts down.

use crate::error::{RegistryError, Result};
use crate::sync::metadata::MetadataCache;
use crate::sync::shutdown::ShutdownSignal;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub struct Scheduler {
    stop: watch::Sender<bool>,
    task: Option<JoinHandle<Result<()>>>,
}

impl Scheduler {
    /// Spawn the catalog loop on the current tokio runtime
    pub fn start(cache: Arc<MetadataCache>) -> Self {
        let (stop, rx) = watch::channel(false);
        let task = tokio::spawn(run_catalog_loop(cache, ShutdownSignal::new(rx)));
        Self {
            stop,
            task: Some(task),
        }
    }

    /// Resolves when the loops have stopped: after [`Scheduler::shutdown`],
    /// or right away with [`RegistryError::CatalogUnavailable`] when the
    /// first catalog fetch failed.
    pub async fn wait(&mut self) -> Result<()> {
        let Some(task) = self.task.as_mut() else {
            return Ok(());
        };
        let joined = task.await;
        self.task = None;
        joined.map_err(|e| RegistryError::Registry(format!("Background job failed: {}", e)))?
    }

    /// Signal both loops to stop and wait until they have
    pub async fn shutdown(mut self) -> Result<()> {
        self.stop.send_replace(true);
        self.wait().await
    }
}

async fn run_catalog_loop(cache: Arc<MetadataCache>, mut shutdown: ShutdownSignal) -> Result<()> {
    let log = cache.catalog_logger().clone();
    let mut tags_task: Option<JoinHandle<()>> = None;

    loop {
        tokio::select! {
            biased;
            _ = shutdown.wait() => break,
            refreshed = cache.refresh_catalog() => {
                refreshed?;
            }
        }

        if tags_task.is_none() {
            if let Some(interval) = cache.policy().tags_interval() {
                tags_task = Some(tokio::spawn(run_tags_loop(
                    Arc::clone(&cache),
                    interval,
                    shutdown.clone(),
                )));
            }
        }

        match cache.policy().catalog_interval() {
            Some(interval) => {
                if shutdown.sleep(interval).await {
                    break;
                }
            }
            None => {
                log.warning("Catalog refresh is disabled in the config and will not run anymore.");
                break;
            }
        }
    }

    // One-shot catalog mode still keeps the tag loop alive until shutdown
    if let Some(task) = tags_task {
        shutdown.wait().await;
        if let Err(e) = task.await {
            log.error(&format!("Tag refresh job ended abnormally: {}", e));
        }
    }
    log.info("Stopped.");
    Ok(())
}

async fn run_tags_loop(cache: Arc<MetadataCache>, interval: Duration, mut shutdown: ShutdownSignal) {
    loop {
        cache.refresh_all_tags(&mut shutdown).await;
        if shutdown.sleep(interval).await {
            break;
        }
    }
    cache.tags_logger().info("Stopped.");
}
