//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::num::{NonZeroU32, NonZeroUsize};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tracing::level_filters::LevelFilter;

use quire::cache::{CacheInvalidator, CacheState, ResponseStore};
use quire::config::{
    AuthSettings, CacheSettings, DatabaseSettings, LogFormat, LoggingSettings, RateLimitSettings,
    ServerSettings, Settings,
};
use quire::infra::db::SqliteRepositories;
use quire::infra::http::{AppState, build_router};

pub const TOKEN: &str = "test-admin-token";

pub fn limit(value: u32) -> NonZeroU32 {
    NonZeroU32::new(value).expect("non-zero limit")
}

pub fn settings() -> Settings {
    Settings {
        server: ServerSettings {
            addr: "127.0.0.1:0".parse().expect("addr"),
            graceful_shutdown: Duration::from_secs(1),
        },
        logging: LoggingSettings {
            level: LevelFilter::INFO,
            format: LogFormat::Compact,
        },
        database: DatabaseSettings {
            url: "sqlite::memory:".to_string(),
            max_connections: limit(1),
        },
        auth: AuthSettings {
            admin_token: Some(TOKEN.to_string()),
        },
        rate_limit: RateLimitSettings {
            window: Duration::from_secs(60),
            admin_write: limit(100),
            admin_read: limit(100),
            public_read: limit(100),
        },
        cache: CacheSettings {
            enabled: true,
            max_entries: NonZeroUsize::new(64).expect("capacity"),
            public_max_age: Duration::from_secs(3600),
        },
        purge: None,
    }
}

pub async fn app_with(settings: Settings) -> Router {
    let pool = SqliteRepositories::connect(&settings.database.url, 1)
        .await
        .expect("open in-memory sqlite");
    SqliteRepositories::run_migrations(&pool)
        .await
        .expect("run migrations");
    let repositories = Arc::new(SqliteRepositories::new(pool));

    let store = Arc::new(ResponseStore::new(
        settings.cache.max_entries,
        settings.cache.public_max_age,
    ));
    let invalidator = CacheInvalidator::new(Some(store.clone()), None);
    let state = AppState::new(repositories, invalidator, &settings);
    build_router(state, Some(CacheState { store }))
}
