use async_trait::async_trait;

use crate::application::repos::{RepoError, SectionsRepo};
use crate::domain::entities::SectionRecord;

use super::SqliteRepositories;
use super::types::SectionRow;
use super::util::map_sqlx_error;

const SECTION_COLUMNS: &str = "id, name, slug, order_index";

#[async_trait]
impl SectionsRepo for SqliteRepositories {
    async fn list_sections(&self) -> Result<Vec<SectionRecord>, RepoError> {
        let sql = format!("SELECT {SECTION_COLUMNS} FROM sections ORDER BY order_index ASC, id ASC");
        let rows = sqlx::query_as::<_, SectionRow>(&sql)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_section_by_id(&self, id: i64) -> Result<Option<SectionRecord>, RepoError> {
        let sql = format!("SELECT {SECTION_COLUMNS} FROM sections WHERE id = ?1");
        let row = sqlx::query_as::<_, SectionRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(Into::into))
    }

    async fn find_section_by_slug(&self, slug: &str) -> Result<Option<SectionRecord>, RepoError> {
        let sql = format!("SELECT {SECTION_COLUMNS} FROM sections WHERE slug = ?1");
        let row = sqlx::query_as::<_, SectionRow>(&sql)
            .bind(slug)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(Into::into))
    }
}

impl SqliteRepositories {
    /// Insert a section; sections have no admin endpoint so this is used by
    /// seeding and tests.
    pub async fn insert_section(
        &self,
        name: &str,
        slug: &str,
        order_index: i64,
    ) -> Result<SectionRecord, RepoError> {
        let sql = format!(
            "INSERT INTO sections (name, slug, order_index) VALUES (?1, ?2, ?3) RETURNING {SECTION_COLUMNS}"
        );
        let row = sqlx::query_as::<_, SectionRow>(&sql)
            .bind(name)
            .bind(slug)
            .bind(order_index)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }
}
