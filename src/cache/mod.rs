//! Public response caching and post-publish invalidation.
//!
//! - [`ResponseStore`]: LRU + TTL store of buffered public GET responses.
//! - [`response_cache_layer`]: middleware serving and filling the store.
//! - [`CacheInvalidator`]: evicts affected paths and purges the CDN after a publish.

mod invalidator;
mod middleware;
pub mod paths;
mod purge;
mod store;

pub use invalidator::{CacheInvalidator, STALE_CACHE_WARNING};
pub use middleware::{CacheState, response_cache_layer};
pub use purge::{CdnPurger, PurgeError};
pub use store::{CachedResponse, ResponseStore};
