//! HTTP plumbing shared by the remote-save and publish clients.

use std::time::Duration;

use quire_api_types::ErrorBody;
use reqwest::{Client, Method, RequestBuilder, Url, header};
use thiserror::Error;

use super::credentials::AdminCredentials;

/// Applied to every admin API call so a stalled connection fails instead of hanging.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ClientSetupError {
    #[error("invalid site URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("failed to build http client: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Clone, Debug)]
pub struct AdminApiClient {
    http: Client,
    base: Url,
    credentials: AdminCredentials,
}

impl AdminApiClient {
    pub fn new(
        site: &str,
        credentials: AdminCredentials,
        timeout: Duration,
    ) -> Result<Self, ClientSetupError> {
        let base = Url::parse(site)?.join("/")?;
        let http = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base,
            credentials,
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("quire-editor/", env!("CARGO_PKG_VERSION"))
    }

    pub fn credentials(&self) -> &AdminCredentials {
        &self.credentials
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn url(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base.join(path)
    }

    pub fn request(&self, method: Method, url: Url, token: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
    }
}

/// The `error` field of a JSON error body, when there is one.
pub fn server_message(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .map(|parsed| parsed.error)
        .filter(|message| !message.trim().is_empty())
}
