//! Public read API.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use quire_api_types::{ArticleView, SectionArticleItem, SectionRef, SectionView};

use crate::domain::entities::{ArticleWithSection, SectionArticleRecord, SectionRecord};

use super::error::{ApiError, repo_to_api};
use super::state::AppState;

const SOURCE: &str = "infra::http::public";

pub async fn list_sections(State(state): State<AppState>) -> Result<Response, ApiError> {
    let sections = state
        .public
        .list_sections()
        .await
        .map_err(|err| repo_to_api(SOURCE, err))?;
    let body: Vec<SectionView> = sections.into_iter().map(section_view).collect();
    Ok(cacheable(&state, body))
}

pub async fn section_articles(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Response, ApiError> {
    let articles = state
        .public
        .section_articles(&slug)
        .await
        .map_err(|err| repo_to_api(SOURCE, err))?
        .ok_or_else(|| ApiError::not_found("Section not found"))?;
    let body: Vec<SectionArticleItem> = articles.into_iter().map(section_item).collect();
    Ok(cacheable(&state, body))
}

pub async fn article(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Response, ApiError> {
    let found = state
        .public
        .published_article(&slug)
        .await
        .map_err(|err| repo_to_api(SOURCE, err))?
        .and_then(article_view)
        .ok_or_else(|| ApiError::not_found("Article not found"))?;
    Ok(cacheable(&state, found))
}

fn cacheable<T: serde::Serialize>(state: &AppState, body: T) -> Response {
    (
        [(header::CACHE_CONTROL, state.public_cache_control())],
        Json(body),
    )
        .into_response()
}

pub(super) fn section_view(section: SectionRecord) -> SectionView {
    SectionView {
        id: section.id,
        name: section.name,
        slug: section.slug,
        order_index: section.order_index,
    }
}

fn section_item(record: SectionArticleRecord) -> SectionArticleItem {
    SectionArticleItem {
        id: record.id,
        title: record.title,
        slug: record.slug,
        published_at: record.published_at,
        is_pinned: record.is_pinned,
    }
}

fn article_view(found: ArticleWithSection) -> Option<ArticleView> {
    let ArticleWithSection { article, section } = found;
    Some(ArticleView {
        id: article.id,
        title: article.title,
        slug: article.slug,
        excerpt: article.excerpt,
        content: article.content,
        section_id: article.section_id,
        section: SectionRef {
            name: section.name,
            slug: section.slug,
        },
        published_at: article.published_at?,
        updated_at: article.updated_at,
        is_pinned: article.is_pinned,
    })
}
