//! One-shot publish action.

use quire_api_types::{PublishRequest, PublishResponse};
use reqwest::{Method, StatusCode};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};

use super::client::{AdminApiClient, server_message};

pub const PUBLISH_FALLBACK_MESSAGE: &str = "Publish failed. Try again.";

/// Publish failures are shown to the user as-is and never retried automatically.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Unauthorized. Please log in again.")]
    Unauthorized,
    #[error("Article not found.")]
    NotFound,
    #[error("Too many requests. Please wait a moment.")]
    RateLimited,
    #[error("{0}")]
    Server(String),
    #[error("Publish failed. Try again.")]
    Network(#[source] reqwest::Error),
}

#[derive(Clone, Debug)]
pub struct PublishClient {
    api: AdminApiClient,
}

impl PublishClient {
    pub fn new(api: AdminApiClient) -> Self {
        Self { api }
    }

    /// Publish `article_id`. Without `published_at` the server uses its own clock.
    pub async fn publish(
        &self,
        article_id: &str,
        published_at: Option<OffsetDateTime>,
    ) -> Result<PublishResponse, PublishError> {
        let token = self
            .api
            .credentials()
            .token()
            .ok_or(PublishError::Unauthorized)?;
        let url = self
            .api
            .url(&format!("api/admin/articles/{article_id}/publish"))
            .map_err(|err| PublishError::Server(err.to_string()))?;

        let response = self
            .api
            .request(Method::POST, url, &token)
            .json(&PublishRequest { published_at })
            .send()
            .await
            .map_err(PublishError::Network)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(PublishError::Network)?;

        let result = match status {
            StatusCode::UNAUTHORIZED => Err(PublishError::Unauthorized),
            StatusCode::NOT_FOUND => Err(PublishError::NotFound),
            StatusCode::TOO_MANY_REQUESTS => Err(PublishError::RateLimited),
            status if !status.is_success() => Err(PublishError::Server(
                server_message(&bytes).unwrap_or_else(|| PUBLISH_FALLBACK_MESSAGE.to_string()),
            )),
            _ => serde_json::from_slice::<PublishResponse>(&bytes)
                .map_err(|err| PublishError::Server(format!("{PUBLISH_FALLBACK_MESSAGE} ({err})"))),
        };

        match &result {
            Ok(published) => {
                info!(
                    target = "quire::editor::publish",
                    article_id,
                    slug = %published.slug,
                    published_at = %published.published_at,
                    "article published"
                );
                if let Some(warning) = published.warning.as_deref() {
                    warn!(
                        target = "quire::editor::publish",
                        article_id,
                        warning,
                        "published with warning"
                    );
                }
            }
            Err(err) => warn!(
                target = "quire::editor::publish",
                article_id,
                status = status.as_u16(),
                error = %err,
                "publish failed"
            ),
        }
        result
    }
}
