//! Cache layer
//!
//! Public pages read through a moka-backed in-process cache. Services own
//! their key prefixes and invalidate them on writes.
//!
//! ```rust,ignore
//! let cache = create_cache(&CacheConfig::default());
//! cache.set("projects:published", &projects).await?;
//! cache.delete_prefix("projects:").await;
//! ```

pub mod memory;

use std::sync::Arc;
use std::time::Duration;

use crate::config::CacheConfig;

pub use memory::MemoryCache;

/// The cache every service shares
pub type Cache = MemoryCache;

/// Build the shared cache from configuration
pub fn create_cache(config: &CacheConfig) -> Arc<Cache> {
    Arc::new(MemoryCache::new(
        config.max_entries,
        Duration::from_secs(config.ttl_seconds.max(1)),
    ))
}
