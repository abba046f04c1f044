use std::sync::Arc;

use crate::application::repos::{ArticlesRepo, RepoError, SectionsRepo};
use crate::domain::entities::{ArticleWithSection, SectionArticleRecord, SectionRecord};

/// Read-only queries behind the public API.
#[derive(Clone)]
pub struct PublicContentService {
    sections: Arc<dyn SectionsRepo>,
    articles: Arc<dyn ArticlesRepo>,
}

impl PublicContentService {
    pub fn new(sections: Arc<dyn SectionsRepo>, articles: Arc<dyn ArticlesRepo>) -> Self {
        Self { sections, articles }
    }

    pub async fn list_sections(&self) -> Result<Vec<SectionRecord>, RepoError> {
        self.sections.list_sections().await
    }

    /// `None` when no section has this slug.
    pub async fn section_articles(
        &self,
        section_slug: &str,
    ) -> Result<Option<Vec<SectionArticleRecord>>, RepoError> {
        let Some(section) = self.sections.find_section_by_slug(section_slug).await? else {
            return Ok(None);
        };
        self.articles
            .list_section_articles(section.id)
            .await
            .map(Some)
    }

    /// Unpublished articles are indistinguishable from missing ones.
    pub async fn published_article(
        &self,
        slug: &str,
    ) -> Result<Option<ArticleWithSection>, RepoError> {
        self.articles.find_published_by_slug(slug).await
    }
}
