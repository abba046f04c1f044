//! CDN cache purge over the zone purge API.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::config::PurgeSettings;

const PURGE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum PurgeError {
    #[error("invalid purge URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("purge request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("purge rejected with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("purge API reported failure: {0}")]
    Rejected(String),
}

#[derive(Serialize)]
struct PurgeRequest<'a> {
    files: &'a [String],
}

#[derive(Deserialize)]
struct PurgeResponse {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    errors: Vec<serde_json::Value>,
}

fn default_success() -> bool {
    true
}

#[derive(Clone, Debug)]
pub struct CdnPurger {
    client: Client,
    endpoint: Url,
    site_base: Url,
    api_token: String,
}

impl CdnPurger {
    pub fn new(settings: &PurgeSettings) -> Result<Self, PurgeError> {
        let endpoint = settings
            .api_base_url
            .join(&format!("zones/{}/purge_cache", settings.zone_id))?;
        let client = Client::builder()
            .user_agent(concat!("quire/", env!("CARGO_PKG_VERSION")))
            .timeout(PURGE_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            endpoint,
            site_base: settings.site_base_url.clone(),
            api_token: settings.api_token.clone(),
        })
    }

    /// Absolute URLs the CDN caches for the given site-relative paths.
    pub fn absolute_urls(&self, paths: &[String]) -> Result<Vec<String>, PurgeError> {
        paths
            .iter()
            .map(|path| {
                self.site_base
                    .join(path.trim_start_matches('/'))
                    .map(String::from)
                    .map_err(PurgeError::from)
            })
            .collect()
    }

    pub async fn purge(&self, paths: &[String]) -> Result<(), PurgeError> {
        let files = self.absolute_urls(paths)?;
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_token)
            .json(&PurgeRequest { files: &files })
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;
        if !status.is_success() {
            return Err(PurgeError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        match serde_json::from_slice::<PurgeResponse>(&bytes) {
            Ok(body) if !body.success => Err(PurgeError::Rejected(
                serde_json::to_string(&body.errors).unwrap_or_default(),
            )),
            _ => Ok(()),
        }
    }
}
