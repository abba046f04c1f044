//! Authenticated create/update of drafts against the admin API.

use async_trait::async_trait;
use quire_api_types::{
    CreateArticleRequest, CreateArticleResponse, UpdateArticleRequest, UpdateArticleResponse,
};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::domain::drafts::Draft;

use super::client::{AdminApiClient, server_message};

/// Section used when a draft has not picked one yet.
pub const DEFAULT_SECTION_ID: i64 = 1;

pub const NOT_AUTHENTICATED_MESSAGE: &str = "Not authenticated";
pub const AUTH_REJECTED_MESSAGE: &str = "Authentication failed. Please log in again.";

#[derive(Debug, Error)]
pub enum RemoteSaveError {
    #[error("Not authenticated")]
    NotAuthenticated,
    #[error("Authentication failed. Please log in again.")]
    AuthRejected,
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),
    #[error("server returned {status}: {message}")]
    Server { status: u16, message: String },
    #[error("unexpected response body: {0}")]
    Decode(String),
    #[error("invalid request URL: {0}")]
    Url(#[from] url::ParseError),
}

impl RemoteSaveError {
    /// Transport and server failures are worth another attempt; credential
    /// and request-construction problems are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RemoteSaveError::Network(_)
                | RemoteSaveError::Server { .. }
                | RemoteSaveError::Decode(_)
        )
    }

    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            RemoteSaveError::NotAuthenticated | RemoteSaveError::AuthRejected
        )
    }

    fn outcome(&self) -> &'static str {
        match self {
            RemoteSaveError::NotAuthenticated | RemoteSaveError::AuthRejected => "auth",
            RemoteSaveError::Network(_) => "network",
            RemoteSaveError::Server { .. } => "server",
            RemoteSaveError::Decode(_) => "decode",
            RemoteSaveError::Url(_) => "url",
        }
    }
}

/// Result of a successful remote save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSaved {
    pub remote_id: String,
    pub updated_at: OffsetDateTime,
    /// The call created the article, so the draft must be rekeyed.
    pub created: bool,
    pub slug: Option<String>,
}

#[async_trait]
pub trait RemoteSaver: Send + Sync {
    async fn save(&self, draft: &Draft) -> Result<RemoteSaved, RemoteSaveError>;
}

#[derive(Clone, Debug)]
pub struct RemoteSaveClient {
    api: AdminApiClient,
    default_section_id: i64,
}

impl RemoteSaveClient {
    pub fn new(api: AdminApiClient) -> Self {
        Self {
            api,
            default_section_id: DEFAULT_SECTION_ID,
        }
    }

    pub fn with_default_section(mut self, section_id: i64) -> Self {
        self.default_section_id = section_id;
        self
    }

    async fn send<B, T>(
        &self,
        method: Method,
        path: &str,
        token: &str,
        body: &B,
    ) -> Result<T, RemoteSaveError>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.api.url(path)?;
        let response = self
            .api
            .request(method, url, token)
            .json(body)
            .send()
            .await
            .map_err(RemoteSaveError::Network)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(RemoteSaveError::Network)?;
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(RemoteSaveError::AuthRejected);
        }
        if !status.is_success() {
            return Err(RemoteSaveError::Server {
                status: status.as_u16(),
                message: server_message(&bytes)
                    .unwrap_or_else(|| format!("Save failed: {}", status.as_u16())),
            });
        }
        serde_json::from_slice(&bytes).map_err(|err| RemoteSaveError::Decode(err.to_string()))
    }

    async fn create(&self, draft: &Draft, token: &str) -> Result<RemoteSaved, RemoteSaveError> {
        let body = CreateArticleRequest {
            title: Some(draft.title.clone()),
            content: Some(draft.content.clone()),
            section_id: Some(draft.section_id.unwrap_or(self.default_section_id)),
        };
        let created: CreateArticleResponse = self
            .send(Method::POST, "api/admin/articles", token, &body)
            .await?;
        Ok(RemoteSaved {
            remote_id: created.id.to_string(),
            updated_at: created.updated_at,
            created: true,
            slug: Some(created.slug),
        })
    }

    async fn update(
        &self,
        remote_id: &str,
        draft: &Draft,
        token: &str,
    ) -> Result<RemoteSaved, RemoteSaveError> {
        let body = UpdateArticleRequest {
            title: Some(draft.title.clone()),
            content: Some(draft.content.clone()),
            section_id: Some(draft.section_id.unwrap_or(self.default_section_id)),
            ..UpdateArticleRequest::default()
        };
        let path = format!("api/admin/articles/{remote_id}");
        let updated: UpdateArticleResponse = self.send(Method::PUT, &path, token, &body).await?;
        Ok(RemoteSaved {
            remote_id: updated.id.to_string(),
            updated_at: updated.updated_at,
            created: false,
            slug: None,
        })
    }
}

#[async_trait]
impl RemoteSaver for RemoteSaveClient {
    async fn save(&self, draft: &Draft) -> Result<RemoteSaved, RemoteSaveError> {
        let result = match self.api.credentials().token() {
            None => Err(RemoteSaveError::NotAuthenticated),
            Some(token) => match draft.remote_id.as_deref() {
                None => self.create(draft, &token).await,
                Some(remote_id) => self.update(remote_id, draft, &token).await,
            },
        };

        match &result {
            Ok(saved) => {
                metrics::counter!("quire_remote_save_total", "outcome" => "success").increment(1);
                debug!(
                    target = "quire::editor::remote",
                    draft_id = %draft.id,
                    remote_id = %saved.remote_id,
                    created = saved.created,
                    "draft saved remotely"
                );
            }
            Err(err) => {
                metrics::counter!("quire_remote_save_total", "outcome" => err.outcome())
                    .increment(1);
                warn!(
                    target = "quire::editor::remote",
                    draft_id = %draft.id,
                    error = %err,
                    retryable = err.is_retryable(),
                    "remote draft save failed"
                );
            }
        }
        result
    }
}
