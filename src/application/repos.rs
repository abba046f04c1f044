//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::domain::entities::{
    ArticleRecord, ArticleWithSection, SectionArticleRecord, SectionRecord,
};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CreateArticleParams {
    pub slug: String,
    pub title: String,
    pub content: String,
    pub section_id: i64,
    pub created_at: OffsetDateTime,
}

/// Partial update; `None` leaves the stored column untouched.
#[derive(Debug, Clone)]
pub struct UpdateArticleParams {
    pub id: i64,
    pub slug: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub section_id: Option<i64>,
    pub excerpt: Option<String>,
    pub is_pinned: Option<bool>,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy)]
pub struct PublishArticleParams {
    pub id: i64,
    /// Applied only when the article has never been published.
    pub published_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[async_trait]
pub trait SectionsRepo: Send + Sync {
    async fn list_sections(&self) -> Result<Vec<SectionRecord>, RepoError>;

    async fn find_section_by_id(&self, id: i64) -> Result<Option<SectionRecord>, RepoError>;

    async fn find_section_by_slug(&self, slug: &str) -> Result<Option<SectionRecord>, RepoError>;
}

#[async_trait]
pub trait ArticlesRepo: Send + Sync {
    /// Every article regardless of publish state, newest `updated_at` first.
    async fn list_articles(&self) -> Result<Vec<ArticleRecord>, RepoError>;

    async fn find_article_by_id(&self, id: i64) -> Result<Option<ArticleRecord>, RepoError>;

    async fn find_article_by_slug(&self, slug: &str) -> Result<Option<ArticleRecord>, RepoError>;

    async fn find_published_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<ArticleWithSection>, RepoError>;

    /// Published articles of a section, pinned first then newest `published_at`.
    async fn list_section_articles(
        &self,
        section_id: i64,
    ) -> Result<Vec<SectionArticleRecord>, RepoError>;
}

#[async_trait]
pub trait ArticlesWriteRepo: Send + Sync {
    async fn create_article(&self, params: CreateArticleParams)
    -> Result<ArticleRecord, RepoError>;

    /// Fails with [`RepoError::NotFound`] when the id is unknown.
    async fn update_article(&self, params: UpdateArticleParams)
    -> Result<ArticleRecord, RepoError>;

    /// Check-and-set publish: `published_at` keeps its first value while
    /// `updated_at` always advances. Returns `None` when the id is unknown.
    async fn publish_article(
        &self,
        params: PublishArticleParams,
    ) -> Result<Option<ArticleRecord>, RepoError>;
}
