//! Client-side working copies of articles.

use quire_api_types::AdminArticleView;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Placeholder id for a draft that has never reached the server.
pub const NEW_DRAFT_ID: &str = "new-draft";

/// In-progress article held by the editor.
///
/// `id` is the local key until the first successful remote create; from then
/// on `id == remote_id`. A draft is either local-only (`remote_id` is `None`)
/// or remote-synced, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub id: String,
    pub title: String,
    pub content: String,
    pub section_id: Option<i64>,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(default)]
    pub remote_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article_slug: Option<String>,
}

/// Editor fields carried by a single edit event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftEdit {
    pub title: String,
    pub content: String,
    pub section_id: Option<i64>,
}

impl Draft {
    /// Blank draft under the shared [`NEW_DRAFT_ID`] key.
    pub fn new_local() -> Self {
        Self::with_local_id(NEW_DRAFT_ID)
    }

    pub fn with_local_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            content: String::new(),
            section_id: None,
            updated_at: OffsetDateTime::now_utc(),
            remote_id: None,
            article_slug: None,
        }
    }

    /// Open an existing server article for editing.
    pub fn from_article(article: &AdminArticleView) -> Self {
        let id = article.id.to_string();
        Self {
            id: id.clone(),
            title: article.title.clone(),
            content: article.content.clone(),
            section_id: Some(article.section_id),
            updated_at: article.updated_at,
            remote_id: Some(id),
            article_slug: Some(article.slug.clone()),
        }
    }

    pub fn is_synced(&self) -> bool {
        self.remote_id.is_some()
    }

    /// Switch the draft over to the server-assigned id.
    pub fn adopt_remote_id(&mut self, remote_id: impl Into<String>) {
        let remote_id = remote_id.into();
        self.id = remote_id.clone();
        self.remote_id = Some(remote_id);
    }

    pub fn apply(&mut self, edit: DraftEdit) {
        self.title = edit.title;
        self.content = edit.content;
        self.section_id = edit.section_id;
    }
}
