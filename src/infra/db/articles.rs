use async_trait::async_trait;

use crate::application::repos::{
    ArticlesRepo, ArticlesWriteRepo, CreateArticleParams, PublishArticleParams, RepoError,
    UpdateArticleParams,
};
use crate::domain::entities::{ArticleRecord, ArticleWithSection, SectionArticleRecord};

use super::SqliteRepositories;
use super::types::{ArticleRow, PublishedArticleRow, SectionArticleRow};
use super::util::map_sqlx_error;

const ARTICLE_COLUMNS: &str = "id, title, slug, excerpt, content, section_id, is_pinned, \
    published_at, created_at, updated_at";

#[async_trait]
impl ArticlesRepo for SqliteRepositories {
    async fn list_articles(&self) -> Result<Vec<ArticleRecord>, RepoError> {
        let sql = format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles ORDER BY julianday(updated_at) DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, ArticleRow>(&sql)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_article_by_id(&self, id: i64) -> Result<Option<ArticleRecord>, RepoError> {
        let sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = ?1");
        let row = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(Into::into))
    }

    async fn find_article_by_slug(&self, slug: &str) -> Result<Option<ArticleRecord>, RepoError> {
        let sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE slug = ?1");
        let row = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(slug)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(Into::into))
    }

    async fn find_published_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<ArticleWithSection>, RepoError> {
        let row = sqlx::query_as::<_, PublishedArticleRow>(
            r#"
            SELECT a.id, a.title, a.slug, a.excerpt, a.content, a.section_id, a.is_pinned,
                   a.published_at, a.created_at, a.updated_at,
                   s.name AS section_name,
                   s.slug AS section_slug,
                   s.order_index AS section_order_index
            FROM articles a
            INNER JOIN sections s ON s.id = a.section_id
            WHERE a.slug = ?1 AND a.published_at IS NOT NULL
            "#,
        )
        .bind(slug)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.map(Into::into))
    }

    async fn list_section_articles(
        &self,
        section_id: i64,
    ) -> Result<Vec<SectionArticleRecord>, RepoError> {
        let rows = sqlx::query_as::<_, SectionArticleRow>(
            r#"
            SELECT id, title, slug, published_at, is_pinned
            FROM articles
            WHERE section_id = ?1 AND published_at IS NOT NULL
            ORDER BY is_pinned DESC, julianday(published_at) DESC, id DESC
            "#,
        )
        .bind(section_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl ArticlesWriteRepo for SqliteRepositories {
    async fn create_article(
        &self,
        params: CreateArticleParams,
    ) -> Result<ArticleRecord, RepoError> {
        let sql = format!(
            "INSERT INTO articles (title, slug, content, section_id, is_pinned, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, 0, ?5, ?5) RETURNING {ARTICLE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(&params.title)
            .bind(&params.slug)
            .bind(&params.content)
            .bind(params.section_id)
            .bind(params.created_at)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn update_article(
        &self,
        params: UpdateArticleParams,
    ) -> Result<ArticleRecord, RepoError> {
        let sql = format!(
            "UPDATE articles SET \
                slug = COALESCE(?2, slug), \
                title = COALESCE(?3, title), \
                content = COALESCE(?4, content), \
                section_id = COALESCE(?5, section_id), \
                excerpt = COALESCE(?6, excerpt), \
                is_pinned = COALESCE(?7, is_pinned), \
                updated_at = ?8 \
             WHERE id = ?1 RETURNING {ARTICLE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(params.id)
            .bind(params.slug)
            .bind(params.title)
            .bind(params.content)
            .bind(params.section_id)
            .bind(params.excerpt)
            .bind(params.is_pinned)
            .bind(params.updated_at)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        row.map(Into::into).ok_or(RepoError::NotFound)
    }

    async fn publish_article(
        &self,
        params: PublishArticleParams,
    ) -> Result<Option<ArticleRecord>, RepoError> {
        // Single statement: concurrent duplicates cannot both see a NULL
        // published_at and overwrite each other.
        let sql = format!(
            "UPDATE articles SET \
                published_at = COALESCE(published_at, ?2), \
                updated_at = ?3 \
             WHERE id = ?1 RETURNING {ARTICLE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(params.id)
            .bind(params.published_at)
            .bind(params.updated_at)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(Into::into))
    }
}

#[cfg(test)]
mod tests {
    use time::{Duration, OffsetDateTime, macros::datetime};

    use super::*;
    use crate::infra::db::test_support::memory_repositories;

    async fn create(repos: &SqliteRepositories, slug: &str) -> ArticleRecord {
        repos
            .create_article(CreateArticleParams {
                slug: slug.to_string(),
                title: slug.to_string(),
                content: format!("body of {slug}"),
                section_id: 1,
                created_at: OffsetDateTime::now_utc(),
            })
            .await
            .expect("create article")
    }

    fn publish_params(id: i64, published_at: OffsetDateTime) -> PublishArticleParams {
        PublishArticleParams {
            id,
            published_at,
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    #[tokio::test]
    async fn publish_keeps_the_first_published_at() {
        let repos = memory_repositories().await;
        let article = create(&repos, "first").await;
        assert!(!article.is_published());

        let first = datetime!(2024-03-01 12:00 UTC);
        let second = datetime!(2025-07-09 08:30 UTC);

        let once = repos
            .publish_article(publish_params(article.id, first))
            .await
            .expect("publish")
            .expect("article exists");
        let twice = repos
            .publish_article(PublishArticleParams {
                id: article.id,
                published_at: second,
                updated_at: once.updated_at + Duration::seconds(1),
            })
            .await
            .expect("publish again")
            .expect("article exists");

        assert_eq!(once.published_at, Some(first));
        assert_eq!(twice.published_at, Some(first));
        assert!(twice.updated_at > once.updated_at);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_publishes_agree_on_one_published_at() {
        let dir = tempfile::tempdir().expect("tempdir");
        let url = format!("sqlite://{}", dir.path().join("quire.db").display());
        let pool = SqliteRepositories::connect(&url, 4)
            .await
            .expect("open sqlite file");
        SqliteRepositories::run_migrations(&pool)
            .await
            .expect("run migrations");
        let repos = SqliteRepositories::new(pool);
        let article = create(&repos, "racy").await;

        let early = datetime!(2024-03-01 12:00 UTC);
        let late = datetime!(2024-03-01 12:00:01 UTC);
        let (left, right) = tokio::join!(
            repos.publish_article(publish_params(article.id, early)),
            repos.publish_article(publish_params(article.id, late)),
        );
        let left = left.expect("publish").expect("article exists");
        let right = right.expect("publish").expect("article exists");

        let stored = repos
            .find_article_by_id(article.id)
            .await
            .expect("find")
            .expect("article exists");
        let published_at = stored.published_at.expect("published");
        assert!(published_at == early || published_at == late);
        assert_eq!(left.published_at, Some(published_at));
        assert_eq!(right.published_at, Some(published_at));
    }

    #[tokio::test]
    async fn publish_unknown_article_returns_none() {
        let repos = memory_repositories().await;
        let result = repos
            .publish_article(publish_params(999, OffsetDateTime::now_utc()))
            .await
            .expect("publish");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn section_listing_puts_pinned_first_then_newest() {
        let repos = memory_repositories().await;
        let old = create(&repos, "old").await;
        let new = create(&repos, "new").await;
        let pinned = create(&repos, "pinned").await;
        let hidden = create(&repos, "hidden").await;

        repos
            .publish_article(publish_params(old.id, datetime!(2024-01-01 0:00 UTC)))
            .await
            .expect("publish old");
        // A fractional-second timestamp sorts correctly against whole seconds.
        repos
            .publish_article(publish_params(new.id, datetime!(2024-01-01 0:00:00.5 UTC)))
            .await
            .expect("publish new");
        repos
            .publish_article(publish_params(pinned.id, datetime!(2023-01-01 0:00 UTC)))
            .await
            .expect("publish pinned");
        repos
            .update_article(UpdateArticleParams {
                id: pinned.id,
                slug: None,
                title: None,
                content: None,
                section_id: None,
                excerpt: None,
                is_pinned: Some(true),
                updated_at: OffsetDateTime::now_utc(),
            })
            .await
            .expect("pin");

        let slugs: Vec<String> = repos
            .list_section_articles(1)
            .await
            .expect("list")
            .into_iter()
            .map(|item| item.slug)
            .collect();
        assert_eq!(slugs, vec!["pinned", "new", "old"]);
        assert!(!slugs.contains(&hidden.slug));
    }

    #[tokio::test]
    async fn unpublished_articles_are_hidden_from_public_lookup() {
        let repos = memory_repositories().await;
        let article = create(&repos, "draft-only").await;
        assert!(
            repos
                .find_published_by_slug(&article.slug)
                .await
                .expect("lookup")
                .is_none()
        );

        repos
            .publish_article(publish_params(article.id, OffsetDateTime::now_utc()))
            .await
            .expect("publish");
        let found = repos
            .find_published_by_slug(&article.slug)
            .await
            .expect("lookup")
            .expect("published");
        assert_eq!(found.section.slug, "general");
        assert_eq!(found.article.id, article.id);
    }

    #[tokio::test]
    async fn partial_update_leaves_absent_fields() {
        let repos = memory_repositories().await;
        let article = create(&repos, "partial").await;
        let updated = repos
            .update_article(UpdateArticleParams {
                id: article.id,
                slug: None,
                title: None,
                content: Some("changed".to_string()),
                section_id: None,
                excerpt: None,
                is_pinned: None,
                updated_at: OffsetDateTime::now_utc(),
            })
            .await
            .expect("update");
        assert_eq!(updated.title, article.title);
        assert_eq!(updated.content, "changed");
    }

    #[tokio::test]
    async fn update_unknown_article_is_not_found() {
        let repos = memory_repositories().await;
        let err = repos
            .update_article(UpdateArticleParams {
                id: 404,
                slug: None,
                title: Some("x".to_string()),
                content: None,
                section_id: None,
                excerpt: None,
                is_pinned: None,
                updated_at: OffsetDateTime::now_utc(),
            })
            .await
            .expect_err("missing");
        assert!(matches!(err, RepoError::NotFound));
    }

    #[tokio::test]
    async fn unknown_section_is_rejected_by_foreign_key() {
        let repos = memory_repositories().await;
        let err = repos
            .create_article(CreateArticleParams {
                slug: "orphan".to_string(),
                title: "orphan".to_string(),
                content: String::new(),
                section_id: 77,
                created_at: OffsetDateTime::now_utc(),
            })
            .await
            .expect_err("foreign key");
        assert!(matches!(err, RepoError::InvalidInput { .. }));
    }
}
