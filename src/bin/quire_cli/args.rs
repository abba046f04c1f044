//! Command-line surface for `quire-cli`.

#![deny(clippy::all, clippy::pedantic)]

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use quire::domain::drafts::NEW_DRAFT_ID;

#[derive(Parser, Debug)]
#[command(name = "quire-cli", version, about = "Quire admin editor CLI", long_about = None)]
pub struct Cli {
    /// Site base URL, e.g. <https://example.com>
    #[arg(long, env = "QUIRE_SITE_URL")]
    pub site: Option<String>,

    /// Path to file containing the admin token (takes precedence over env)
    #[arg(long, env = "QUIRE_ADMIN_TOKEN_FILE")]
    pub token_file: Option<PathBuf>,

    /// Admin token from env only; there is no flag so it stays out of shell history
    #[arg(long = "token-env", hide = true, env = "QUIRE_ADMIN_TOKEN")]
    pub token_env: Option<String>,

    /// Directory holding local drafts
    #[arg(long, env = "QUIRE_DRAFTS_DIR", default_value = ".quire/drafts")]
    pub drafts_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Local draft management and syncing
    Drafts(DraftsArgs),
    /// Publish an article
    Publish(PublishArgs),
    /// Articles on the server
    Articles(ArticlesArgs),
}

#[derive(Args, Debug)]
pub struct DraftsArgs {
    #[command(subcommand)]
    pub action: DraftsCmd,
}

#[derive(Subcommand, Debug)]
pub enum DraftsCmd {
    /// List local drafts, newest first
    List,
    /// Print one draft
    Show { id: String },
    /// Delete a local draft
    Discard { id: String },
    /// Apply title/content changes and save locally and remotely
    Edit(EditArgs),
    /// Save a local draft to the server as it is
    Push { id: String },
}

#[derive(Args, Debug)]
pub struct EditArgs {
    /// Draft id; the placeholder id starts a new draft
    #[arg(default_value = NEW_DRAFT_ID)]
    pub id: String,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub content: Option<String>,
    /// Read content from a file instead of --content
    #[arg(long)]
    pub content_file: Option<PathBuf>,
    #[arg(long)]
    pub section_id: Option<i64>,
    /// Skip the server save
    #[arg(long)]
    pub local_only: bool,
}

#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Server article id
    pub id: String,
    /// Publish time (RFC 3339); the server clock is used when omitted
    #[arg(long)]
    pub at: Option<String>,
}

#[derive(Args, Debug)]
pub struct ArticlesArgs {
    #[command(subcommand)]
    pub action: ArticlesCmd,
}

#[derive(Subcommand, Debug)]
pub enum ArticlesCmd {
    /// List every article, drafts included
    List,
    /// Fetch an article into the local draft directory
    Open {
        id: String,
        /// Replace an existing local draft with the same id
        #[arg(long)]
        force: bool,
    },
}
