//! Bearer-token gate for the admin API.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderValue, Request, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;
use tracing::warn;

use super::error::ApiError;
use super::state::AppState;

/// The configured admin token. With no token configured every request is refused.
#[derive(Clone, Default)]
pub struct AdminAuth {
    token: Option<Arc<str>>,
}

impl AdminAuth {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.map(Arc::from),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.token.is_some()
    }

    pub fn verify(&self, header: Option<&HeaderValue>) -> bool {
        let Some(expected) = self.token.as_deref() else {
            return false;
        };
        let Some(presented) = header.and_then(bearer_token) else {
            return false;
        };
        presented.as_bytes().ct_eq(expected.as_bytes()).into()
    }
}

/// Extract the credential from `Authorization: Bearer <token>`.
/// The scheme is case-insensitive and surrounding whitespace is ignored.
fn bearer_token(value: &HeaderValue) -> Option<&str> {
    let raw = value.to_str().ok()?.trim();
    let (scheme, rest) = raw.split_once(char::is_whitespace)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = rest.trim();
    (!token.is_empty()).then_some(token)
}

pub async fn require_admin(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.auth.is_configured() {
        warn!(
            target = "quire::http::auth",
            "admin request refused: no admin token configured"
        );
        return ApiError::unauthorized().into_response();
    }
    if !state
        .auth
        .verify(request.headers().get(header::AUTHORIZATION))
    {
        return ApiError::unauthorized().into_response();
    }
    next.run(request).await
}
