//! Post-publish cache invalidation.
//!
//! The in-process store is evicted synchronously. The CDN purge runs as a
//! detached task so a slow or failing CDN never holds up the publish response.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::application::articles::ArticleCacheHook;

use super::paths::article_paths;
use super::purge::CdnPurger;
use super::store::ResponseStore;

/// Soft warning attached to publish responses when no CDN purge is configured.
pub const STALE_CACHE_WARNING: &str = "Cache may be stale for up to 1 hour.";

#[derive(Clone, Default)]
pub struct CacheInvalidator {
    store: Option<Arc<ResponseStore>>,
    purger: Option<Arc<CdnPurger>>,
}

impl CacheInvalidator {
    pub fn new(store: Option<Arc<ResponseStore>>, purger: Option<CdnPurger>) -> Self {
        Self {
            store,
            purger: purger.map(Arc::new),
        }
    }

    pub fn has_purger(&self) -> bool {
        self.purger.is_some()
    }

    fn evict_local(&self, paths: &[String]) {
        if let Some(store) = self.store.as_ref() {
            let evicted: usize = paths.iter().map(|path| store.invalidate_path(path)).sum();
            info!(
                target = "quire::cache::invalidate",
                paths = ?paths,
                evicted,
                "evicted cached responses"
            );
        }
    }

    /// Spawn the CDN purge for `paths`. The returned handle is never joined by
    /// request handlers; tests use it to wait for completion.
    pub fn spawn_purge(&self, paths: Vec<String>) -> Option<JoinHandle<()>> {
        let purger = self.purger.clone()?;
        Some(tokio::spawn(async move {
            match purger.purge(&paths).await {
                Ok(()) => {
                    metrics::counter!("quire_cache_purge_total", "outcome" => "success")
                        .increment(1);
                    info!(
                        target = "quire::cache::purge",
                        paths = ?paths,
                        "CDN cache purged"
                    );
                }
                Err(err) => {
                    metrics::counter!("quire_cache_purge_total", "outcome" => "failure")
                        .increment(1);
                    warn!(
                        target = "quire::cache::purge",
                        paths = ?paths,
                        error = %err,
                        "Article published, but cache purge failed. Cache may be stale for up to 1 hour."
                    );
                }
            }
        }))
    }

    /// Forget the article detail, its section listing and the site root.
    /// Returns a soft warning when the CDN cannot be told.
    pub fn invalidate_article(&self, article_slug: &str, section_slug: &str) -> Option<String> {
        let paths = article_paths(article_slug, section_slug);
        self.evict_local(&paths);

        if self.spawn_purge(paths).is_some() {
            None
        } else {
            metrics::counter!("quire_cache_purge_total", "outcome" => "skipped").increment(1);
            warn!(
                target = "quire::cache::purge",
                article_slug,
                "CDN purge not configured; set purge.zone_id and purge.api_token. {}",
                STALE_CACHE_WARNING
            );
            Some(STALE_CACHE_WARNING.to_string())
        }
    }
}

impl ArticleCacheHook for CacheInvalidator {
    fn article_published(&self, article_slug: &str, section_slug: &str) -> Option<String> {
        self.invalidate_article(article_slug, section_slug)
    }

    fn article_changed(&self, article_slug: &str, section_slug: &str) {
        self.evict_local(&article_paths(article_slug, section_slug));
    }
}
