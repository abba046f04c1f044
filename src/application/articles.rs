//! Admin-side article workflow: create, partial update, publish.

use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;

use crate::application::repos::{
    ArticlesRepo, ArticlesWriteRepo, CreateArticleParams, PublishArticleParams, RepoError,
    SectionsRepo, UpdateArticleParams,
};
use crate::domain::entities::{ArticleRecord, SectionRecord};
use crate::domain::error::DomainError;
use crate::domain::slug::{SlugAsyncError, generate_unique_slug_async};

#[derive(Debug, Error)]
pub enum AdminArticleError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("article not found")]
    NotFound,
    #[error("section `{0}` does not exist")]
    UnknownSection(i64),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Downstream caches that must forget an article once its public view changes.
pub trait ArticleCacheHook: Send + Sync {
    /// Called after a successful publish. Returns a soft warning when some
    /// cache layer could not be told about the change.
    fn article_published(&self, article_slug: &str, section_slug: &str) -> Option<String>;

    /// Called after an already-published article was edited.
    fn article_changed(&self, article_slug: &str, section_slug: &str);
}

#[derive(Debug, Clone, Default)]
pub struct CreateArticleCommand {
    pub title: Option<String>,
    pub content: Option<String>,
    pub section_id: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateArticleCommand {
    pub title: Option<String>,
    pub content: Option<String>,
    pub section_id: Option<i64>,
    pub excerpt: Option<String>,
    pub is_pinned: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct PublishOutcome {
    pub article: ArticleRecord,
    pub section: SectionRecord,
    pub warning: Option<String>,
}

#[derive(Clone)]
pub struct AdminArticleService {
    reader: Arc<dyn ArticlesRepo>,
    writer: Arc<dyn ArticlesWriteRepo>,
    sections: Arc<dyn SectionsRepo>,
    cache: Arc<dyn ArticleCacheHook>,
}

impl AdminArticleService {
    pub fn new(
        reader: Arc<dyn ArticlesRepo>,
        writer: Arc<dyn ArticlesWriteRepo>,
        sections: Arc<dyn SectionsRepo>,
        cache: Arc<dyn ArticleCacheHook>,
    ) -> Self {
        Self {
            reader,
            writer,
            sections,
            cache,
        }
    }

    pub async fn list_articles(&self) -> Result<Vec<ArticleRecord>, AdminArticleError> {
        Ok(self.reader.list_articles().await?)
    }

    pub async fn get_article(&self, id: i64) -> Result<ArticleRecord, AdminArticleError> {
        self.reader
            .find_article_by_id(id)
            .await?
            .ok_or(AdminArticleError::NotFound)
    }

    pub async fn create_article(
        &self,
        command: CreateArticleCommand,
    ) -> Result<ArticleRecord, AdminArticleError> {
        let title = required(command.title, "title")?;
        let content = required(command.content, "content")?;
        let section_id = required(command.section_id, "section_id")?;
        self.require_section(section_id).await?;

        let slug = self.unique_slug(&title, None).await?;
        let article = self
            .writer
            .create_article(CreateArticleParams {
                slug,
                title,
                content,
                section_id,
                created_at: OffsetDateTime::now_utc(),
            })
            .await?;

        info!(
            target = "quire::application::articles",
            article_id = article.id,
            slug = %article.slug,
            "article created"
        );
        Ok(article)
    }

    /// Apply a partial update. Unpublished articles follow their title with a
    /// fresh slug; published slugs stay fixed so public URLs keep working.
    pub async fn update_article(
        &self,
        id: i64,
        command: UpdateArticleCommand,
    ) -> Result<ArticleRecord, AdminArticleError> {
        let current = self.get_article(id).await?;
        if let Some(section_id) = command.section_id {
            self.require_section(section_id).await?;
        }

        let slug = match command.title.as_deref() {
            Some(title) if !current.is_published() && title != current.title => {
                Some(self.unique_slug(title, Some(id)).await?)
            }
            _ => None,
        };

        let updated = self
            .writer
            .update_article(UpdateArticleParams {
                id,
                slug,
                title: command.title,
                content: command.content,
                section_id: command.section_id,
                excerpt: command.excerpt,
                is_pinned: command.is_pinned,
                updated_at: OffsetDateTime::now_utc(),
            })
            .await
            .map_err(not_found_as_missing_article)?;

        if updated.is_published() {
            let section = self.require_section(updated.section_id).await?;
            self.cache.article_changed(&updated.slug, &section.slug);
            if section.id != current.section_id {
                if let Some(previous) = self.sections.find_section_by_id(current.section_id).await? {
                    self.cache.article_changed(&current.slug, &previous.slug);
                }
            }
        }

        Ok(updated)
    }

    /// Publish an article. A repeat publish keeps the first `published_at`
    /// and only advances `updated_at`.
    pub async fn publish_article(
        &self,
        id: i64,
        published_at: Option<OffsetDateTime>,
    ) -> Result<PublishOutcome, AdminArticleError> {
        let now = OffsetDateTime::now_utc();
        let article = self
            .writer
            .publish_article(PublishArticleParams {
                id,
                published_at: published_at.unwrap_or(now),
                updated_at: now,
            })
            .await?
            .ok_or(AdminArticleError::NotFound)?;

        let section = self.require_section(article.section_id).await?;
        let warning = self.cache.article_published(&article.slug, &section.slug);

        metrics::counter!("quire_publish_total").increment(1);
        info!(
            target = "quire::application::articles",
            article_id = article.id,
            slug = %article.slug,
            published_at = ?article.published_at,
            "article published"
        );

        Ok(PublishOutcome {
            article,
            section,
            warning,
        })
    }

    async fn require_section(&self, section_id: i64) -> Result<SectionRecord, AdminArticleError> {
        self.sections
            .find_section_by_id(section_id)
            .await?
            .ok_or(AdminArticleError::UnknownSection(section_id))
    }

    async fn unique_slug(
        &self,
        title: &str,
        owner: Option<i64>,
    ) -> Result<String, AdminArticleError> {
        let reader = self.reader.clone();
        let result = generate_unique_slug_async(title, move |candidate| {
            let reader = reader.clone();
            let candidate = candidate.to_string();
            async move {
                reader
                    .find_article_by_slug(&candidate)
                    .await
                    .map(|existing| existing.is_none_or(|article| Some(article.id) == owner))
            }
        })
        .await;

        match result {
            Ok(slug) => Ok(slug),
            Err(SlugAsyncError::Slug(err)) => {
                Err(DomainError::validation("title", err.to_string()).into())
            }
            Err(SlugAsyncError::Predicate(err)) => Err(err.into()),
        }
    }
}

fn required<T>(value: Option<T>, field: &'static str) -> Result<T, AdminArticleError> {
    value.ok_or_else(|| DomainError::validation(field, "is required").into())
}

fn not_found_as_missing_article(err: RepoError) -> AdminArticleError {
    match err {
        RepoError::NotFound => AdminArticleError::NotFound,
        other => AdminArticleError::Repo(other),
    }
}
