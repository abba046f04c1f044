#![deny(clippy::all, clippy::pedantic)]

use quire::domain::drafts::Draft;
use quire::editor::DraftStore;
use quire_api_types::AdminArticleView;

use crate::args::ArticlesCmd;
use crate::client::{CliError, Ctx};
use crate::print::print_json;

pub async fn handle(ctx: &Ctx, cmd: ArticlesCmd) -> Result<(), CliError> {
    match cmd {
        ArticlesCmd::List => {
            let articles: Vec<AdminArticleView> = ctx.get_json("api/admin/articles").await?;
            print_json(&articles)
        }
        ArticlesCmd::Open { id, force } => open(ctx, &id, force).await,
    }
}

async fn open(ctx: &Ctx, id: &str, force: bool) -> Result<(), CliError> {
    if id.parse::<i64>().is_err() {
        return Err(CliError::InvalidInput(format!("article id must be numeric: {id}")));
    }
    let store = ctx.store().await?;
    if !force && store.load(id).await?.is_some() {
        return Err(CliError::InvalidInput(format!(
            "local draft {id} exists; use --force to replace it"
        )));
    }

    let article: AdminArticleView = ctx.get_json(&format!("api/admin/articles/{id}")).await?;
    let saved = store.save(&Draft::from_article(&article)).await?;
    print_json(&saved)
}
