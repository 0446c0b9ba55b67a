//! Where a tag listing is served from

use crate::config::RefreshPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagSource {
    /// Fetch from the registry now and cache the result
    Online,
    /// Serve the cached list without a network call
    Cached,
    /// Nothing cached and not eligible for an online fetch
    NotReady,
}

/// Precedence, first match wins:
///
/// | background refresh | online max | cached count    | source     |
/// |--------------------|------------|-----------------|------------|
/// | off                | any        | any             | `Online`   |
/// | on                 | > 0        | `Some(n <= max)`| `Online`   |
/// | on                 | any        | `Some(_)`       | `Cached`   |
/// | on                 | any        | `None`          | `NotReady` |
pub fn choose_tag_source(policy: &RefreshPolicy, cached_count: Option<usize>) -> TagSource {
    let max_count = policy.tags_online_refresh_max_count;
    match (policy.background_tags_enabled(), cached_count) {
        (false, _) => TagSource::Online,
        (true, Some(count)) if max_count > 0 && count <= max_count => TagSource::Online,
        (true, Some(_)) => TagSource::Cached,
        (true, None) => TagSource::NotReady,
    }
}
