use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionRecord {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub order_index: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRecord {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub section_id: i64,
    pub is_pinned: bool,
    /// Set by the first successful publish and never moved afterwards.
    pub published_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl ArticleRecord {
    pub fn is_published(&self) -> bool {
        self.published_at.is_some()
    }
}

/// Article joined with the section it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleWithSection {
    pub article: ArticleRecord,
    pub section: SectionRecord,
}

/// Listing row for a section page; only published articles appear here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionArticleRecord {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub published_at: OffsetDateTime,
    pub is_pinned: bool,
}
