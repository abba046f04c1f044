mod admin;
mod auth;
mod error;
mod middleware;
mod public;
mod rate_limit;
mod state;

pub use auth::AdminAuth;
pub use error::ApiError;
pub use rate_limit::{AccessKind, EndpointClass, RateDecision, RateLimiter, client_ip};
pub use state::AppState;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Router, middleware as axum_middleware};

use crate::application::error::ErrorReport;
use crate::cache::{CacheState, response_cache_layer};

/// Assemble the public and admin APIs. Rate limiting runs before
/// authentication, and the response cache only wraps public reads.
pub fn build_router(state: AppState, cache: Option<CacheState>) -> Router {
    let mut public = Router::new()
        .route("/api/sections", get(public::list_sections))
        .route(
            "/api/sections/{slug}/articles",
            get(public::section_articles),
        )
        .route("/api/articles/{slug}", get(public::article));
    if let Some(cache) = cache {
        public = public.layer(axum_middleware::from_fn_with_state(
            cache,
            response_cache_layer,
        ));
    }
    let public = public.layer(axum_middleware::from_fn_with_state(
        state.clone(),
        rate_limit::limit_public,
    ));

    let admin = Router::new()
        .route(
            "/api/admin/articles",
            get(admin::list_articles).post(admin::create_article),
        )
        .route(
            "/api/admin/articles/{id}",
            get(admin::get_article).put(admin::update_article),
        )
        .route(
            "/api/admin/articles/{id}/publish",
            post(admin::publish_article),
        )
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth::require_admin,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            rate_limit::limit_admin,
        ));

    Router::new()
        .route("/api/health", get(health))
        .merge(public)
        .merge(admin)
        .fallback(not_found)
        .with_state(state)
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}

async fn health(State(state): State<AppState>) -> Response {
    match state.db.health_check().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

async fn not_found() -> ApiError {
    ApiError::not_found("Not found")
}
