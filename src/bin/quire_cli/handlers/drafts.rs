#![deny(clippy::all, clippy::pedantic)]

use quire::domain::drafts::{Draft, DraftEdit, NEW_DRAFT_ID};
use quire::editor::DraftStore;
use serde::Serialize;
use time::OffsetDateTime;

use crate::args::{DraftsCmd, EditArgs};
use crate::client::{CliError, Ctx};
use crate::io::read_opt_value;
use crate::print::print_json;

#[derive(Serialize)]
struct DraftSummary {
    id: String,
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    remote_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    updated_at: OffsetDateTime,
}

pub async fn handle(ctx: &Ctx, cmd: DraftsCmd) -> Result<(), CliError> {
    match cmd {
        DraftsCmd::List => list(ctx).await,
        DraftsCmd::Show { id } => show(ctx, &id).await,
        DraftsCmd::Discard { id } => discard(ctx, &id).await,
        DraftsCmd::Edit(args) => edit(ctx, args).await,
        DraftsCmd::Push { id } => push(ctx, &id).await,
    }
}

async fn list(ctx: &Ctx) -> Result<(), CliError> {
    let store = ctx.store().await?;
    let rows: Vec<DraftSummary> = store
        .list_all()
        .await?
        .into_iter()
        .map(|draft| DraftSummary {
            id: draft.id,
            title: draft.title,
            remote_id: draft.remote_id,
            updated_at: draft.updated_at,
        })
        .collect();
    print_json(&rows)
}

async fn show(ctx: &Ctx, id: &str) -> Result<(), CliError> {
    let store = ctx.store().await?;
    let draft = store
        .load(id)
        .await?
        .ok_or_else(|| CliError::NoDraft(id.to_string()))?;
    print_json(&draft)
}

async fn discard(ctx: &Ctx, id: &str) -> Result<(), CliError> {
    let store = ctx.store().await?;
    store.delete(id).await?;
    println!("discarded {id}");
    Ok(())
}

pub async fn edit(ctx: &Ctx, args: EditArgs) -> Result<(), CliError> {
    let content = read_opt_value(args.content, args.content_file)?;
    if args.title.is_none() && content.is_none() && args.section_id.is_none() {
        return Err(CliError::InvalidInput(
            "nothing to change (use --title, --content, --content-file or --section-id)".into(),
        ));
    }

    let store = ctx.store().await?;
    let mut draft = match store.load(&args.id).await? {
        Some(draft) => draft,
        None if args.id == NEW_DRAFT_ID => Draft::new_local(),
        None => return Err(CliError::NoDraft(args.id.clone())),
    };
    let edit = DraftEdit {
        title: args.title.unwrap_or_else(|| draft.title.clone()),
        content: content.unwrap_or_else(|| draft.content.clone()),
        section_id: args.section_id.or(draft.section_id),
    };

    if args.local_only {
        draft.apply(edit);
        let saved = store.save(&draft).await?;
        return print_json(&saved);
    }

    let session = ctx.coordinator().await?.open(draft);
    session.on_edit(edit);
    let local = session.force_local_save().await?;
    let remote = session.force_remote_save().await;
    session.cancel_pending();
    if let Err(err) = remote {
        eprintln!("saved locally as {}", local.id);
        return Err(err.into());
    }
    print_json(&session.draft())
}

pub async fn push(ctx: &Ctx, id: &str) -> Result<(), CliError> {
    let coordinator = ctx.coordinator().await?;
    let session = coordinator
        .resume(id)
        .await?
        .ok_or_else(|| CliError::NoDraft(id.to_string()))?;
    session.force_remote_save().await?;
    session.cancel_pending();
    print_json(&session.draft())
}
