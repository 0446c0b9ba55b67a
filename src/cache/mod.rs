//! In-memory mirror of the registry namespace
//!
//! Three independent structures, each owning its lock: the repository
//! catalog, the per-repository tag lists and the job bookkeeping. Nothing here
//! talks to the registry; see [`crate::sync`] for the code that fills them.

pub mod catalog;
pub mod job;
pub mod tags;

pub use catalog::{CatalogCache, CatalogCommit};
pub use job::{JobInfo, JobTracker};
pub use tags::{RepoTagCount, TagsCache};
