//! Registry Catalog Cache Library
//!
//! An in-memory, background-synchronized mirror of a container registry's
//! repository catalog and tag lists, with policy-driven online refresh,
//! aggregate statistics and tag deletion.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod registry;
pub mod sync;

pub use config::{AppConfig, RefreshPolicy, RegistryConfig};
pub use error::{RegistryError, Result};
pub use logging::Logger;
pub use registry::{CatalogPage, Descriptor, HttpRegistryClient, RegistryApi};
pub use sync::{MetadataCache, Scheduler, TagListing};
