//! Response cache middleware for public GET routes.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::BodyExt;
use tracing::{debug, warn};

use super::store::{CachedResponse, ResponseStore};

/// Shared state for [`response_cache_layer`].
#[derive(Clone)]
pub struct CacheState {
    pub store: Arc<ResponseStore>,
}

/// Serve cached public responses and store fresh `200 OK` ones.
pub async fn response_cache_layer(
    State(cache): State<CacheState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() != Method::GET {
        return next.run(request).await;
    }

    let key = ResponseStore::key(request.uri().path(), request.uri().query());
    if let Some(cached) = cache.store.get(&key) {
        debug!(target = "quire::cache", key = %key, outcome = "hit", "serving cached response");
        return build_response(cached);
    }

    metrics::counter!("quire_response_cache_miss_total").increment(1);
    let response = next.run(request).await;
    if response.status() != StatusCode::OK {
        return response;
    }

    let (parts, body) = response.into_parts();
    match body.collect().await {
        Ok(collected) => {
            let bytes = collected.to_bytes();
            cache.store.put(
                key,
                CachedResponse::new(parts.status, &parts.headers, bytes.clone()),
            );
            Response::from_parts(parts, Body::from(bytes))
        }
        Err(err) => {
            warn!(
                target = "quire::cache",
                key = %key,
                error = %err,
                "failed to buffer response body"
            );
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn build_response(cached: CachedResponse) -> Response {
    let mut response = Response::new(Body::from(cached.body));
    *response.status_mut() = cached.status;
    let headers = response.headers_mut();
    for (name, value) in cached.headers {
        headers.append(name, value);
    }
    response
}
