#![deny(clippy::all, clippy::pedantic)]

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use quire::editor::client::{DEFAULT_REQUEST_TIMEOUT, server_message};
use quire::editor::{
    AdminApiClient, AdminCredentials, AutosaveCoordinator, ClientSetupError, DraftStoreError,
    FsDraftStore, PublishClient, PublishError, RemoteSaveClient, RemoteSaveError,
};
use reqwest::Method;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::args::Cli;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("site URL is required (use --site or QUIRE_SITE_URL)")]
    MissingSite,
    #[error("admin token is required (use --token-file or QUIRE_ADMIN_TOKEN)")]
    MissingToken,
    #[error("failed to read token file: {0}")]
    TokenFile(std::io::Error),
    #[error("failed to read input file {path}: {source}")]
    InputFile {
        path: String,
        source: std::io::Error,
    },
    #[error("no local draft `{0}`")]
    NoDraft(String),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server error: {0}")]
    Server(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Setup(#[from] ClientSetupError),
    #[error(transparent)]
    Drafts(#[from] DraftStoreError),
    #[error("remote save failed: {0}")]
    Remote(#[from] RemoteSaveError),
    #[error("{0}")]
    Publish(#[from] PublishError),
}

/// Everything a command may need. Nothing touches the network or the draft
/// directory until a command asks for it.
#[derive(Clone, Debug)]
pub struct Ctx {
    pub site: Option<String>,
    pub credentials: AdminCredentials,
    pub drafts_dir: PathBuf,
}

impl Ctx {
    pub fn new(site: Option<String>, token: Option<String>, drafts_dir: PathBuf) -> Self {
        let token = token.filter(|t| !t.trim().is_empty());
        Self {
            site,
            credentials: AdminCredentials::new(token),
            drafts_dir,
        }
    }

    pub fn api(&self) -> Result<AdminApiClient, CliError> {
        let site = self.site.as_deref().ok_or(CliError::MissingSite)?;
        Ok(AdminApiClient::new(
            site,
            self.credentials.clone(),
            DEFAULT_REQUEST_TIMEOUT,
        )?)
    }

    /// Like [`Ctx::api`] but refuses to continue without a token.
    pub fn authed_api(&self) -> Result<AdminApiClient, CliError> {
        if !self.credentials.is_authenticated() {
            return Err(CliError::MissingToken);
        }
        self.api()
    }

    pub async fn store(&self) -> Result<Arc<FsDraftStore>, CliError> {
        Ok(Arc::new(FsDraftStore::open(self.drafts_dir.clone()).await?))
    }

    pub async fn coordinator(&self) -> Result<AutosaveCoordinator, CliError> {
        let remote = RemoteSaveClient::new(self.authed_api()?);
        Ok(AutosaveCoordinator::new(
            self.store().await?,
            Arc::new(remote),
        ))
    }

    pub fn publisher(&self) -> Result<PublishClient, CliError> {
        Ok(PublishClient::new(self.authed_api()?))
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, CliError> {
        let api = self.authed_api()?;
        let token = self.credentials.token().ok_or(CliError::MissingToken)?;
        let url = api.url(path)?;
        let resp = api.request(Method::GET, url, &token).send().await?;

        let status = resp.status();
        let bytes = resp.bytes().await?;
        if !status.is_success() {
            let text = server_message(&bytes)
                .unwrap_or_else(|| String::from_utf8_lossy(&bytes).into_owned());
            return Err(CliError::Server(format!("status {status}: {text}")));
        }
        serde_json::from_slice(&bytes)
            .map_err(|e| CliError::Server(format!("failed to parse body: {e}")))
    }
}

pub fn build_ctx_from_cli(cli: &Cli) -> Result<Ctx, CliError> {
    let token = if let Some(path) = &cli.token_file {
        Some(
            fs::read_to_string(path)
                .map_err(CliError::TokenFile)?
                .trim()
                .to_string(),
        )
    } else {
        cli.token_env.clone()
    };

    Ok(Ctx::new(cli.site.clone(), token, cli.drafts_dir.clone()))
}
