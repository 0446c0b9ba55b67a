//! Keeping the cache in step with the registry
//!
//! - [`MetadataCache`]: the cache facade and every read/refresh/delete operation
//! - [`Scheduler`]: the two periodic refresh loops
//! - [`choose_tag_source`]: cache-or-registry decision for tag listings

pub mod decision;
pub mod metadata;
pub mod scheduler;
pub mod shutdown;

pub use decision::{TagSource, choose_tag_source};
pub use metadata::{CatalogRefresh, MetadataCache, Statistics, TagListing, TagsPass};
pub use scheduler::Scheduler;
pub use shutdown::ShutdownSignal;
