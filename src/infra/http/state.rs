use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;

use crate::application::articles::AdminArticleService;
use crate::application::public::PublicContentService;
use crate::application::repos::{ArticlesRepo, ArticlesWriteRepo, SectionsRepo};
use crate::cache::CacheInvalidator;
use crate::config::Settings;
use crate::infra::db::SqliteRepositories;

use super::auth::AdminAuth;
use super::rate_limit::RateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub public: Arc<PublicContentService>,
    pub articles: Arc<AdminArticleService>,
    pub db: Arc<SqliteRepositories>,
    pub auth: AdminAuth,
    pub rate_limiter: Arc<RateLimiter>,
    pub public_max_age: Duration,
}

impl AppState {
    /// Wire the services over one set of repositories.
    pub fn new(
        repositories: Arc<SqliteRepositories>,
        invalidator: CacheInvalidator,
        settings: &Settings,
    ) -> Self {
        let sections: Arc<dyn SectionsRepo> = repositories.clone();
        let reader: Arc<dyn ArticlesRepo> = repositories.clone();
        let writer: Arc<dyn ArticlesWriteRepo> = repositories.clone();

        Self {
            public: Arc::new(PublicContentService::new(sections.clone(), reader.clone())),
            articles: Arc::new(AdminArticleService::new(
                reader,
                writer,
                sections,
                Arc::new(invalidator),
            )),
            db: repositories,
            auth: AdminAuth::new(settings.auth.admin_token.clone()),
            rate_limiter: Arc::new(RateLimiter::new(&settings.rate_limit)),
            public_max_age: settings.cache.public_max_age,
        }
    }

    /// `Cache-Control` value for public read responses.
    pub fn public_cache_control(&self) -> HeaderValue {
        HeaderValue::from_str(&format!(
            "public, max-age={}",
            self.public_max_age.as_secs()
        ))
        .unwrap_or_else(|_| HeaderValue::from_static("public, max-age=3600"))
    }
}
