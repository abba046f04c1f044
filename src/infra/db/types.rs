use time::OffsetDateTime;

use crate::domain::entities::{
    ArticleRecord, ArticleWithSection, SectionArticleRecord, SectionRecord,
};

#[derive(sqlx::FromRow)]
pub(crate) struct SectionRow {
    pub(crate) id: i64,
    pub(crate) name: String,
    pub(crate) slug: String,
    pub(crate) order_index: i64,
}

impl From<SectionRow> for SectionRecord {
    fn from(row: SectionRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            order_index: row.order_index,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ArticleRow {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) slug: String,
    pub(crate) excerpt: Option<String>,
    pub(crate) content: String,
    pub(crate) section_id: i64,
    pub(crate) is_pinned: bool,
    pub(crate) published_at: Option<OffsetDateTime>,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) updated_at: OffsetDateTime,
}

impl From<ArticleRow> for ArticleRecord {
    fn from(row: ArticleRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            slug: row.slug,
            excerpt: row.excerpt,
            content: row.content,
            section_id: row.section_id,
            is_pinned: row.is_pinned,
            published_at: row.published_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct PublishedArticleRow {
    #[sqlx(flatten)]
    pub(crate) article: ArticleRow,
    pub(crate) section_name: String,
    pub(crate) section_slug: String,
    pub(crate) section_order_index: i64,
}

impl From<PublishedArticleRow> for ArticleWithSection {
    fn from(row: PublishedArticleRow) -> Self {
        let section = SectionRecord {
            id: row.article.section_id,
            name: row.section_name,
            slug: row.section_slug,
            order_index: row.section_order_index,
        };
        Self {
            article: row.article.into(),
            section,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct SectionArticleRow {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) slug: String,
    pub(crate) published_at: OffsetDateTime,
    pub(crate) is_pinned: bool,
}

impl From<SectionArticleRow> for SectionArticleRecord {
    fn from(row: SectionArticleRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            slug: row.slug,
            published_at: row.published_at,
            is_pinned: row.is_pinned,
        }
    }
}
