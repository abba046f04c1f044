//! Authenticated article management API.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use quire_api_types::{
    AdminArticleView, ArticleStatus, CreateArticleRequest, CreateArticleResponse, PUBLISHED_STATUS,
    PublishRequest, PublishResponse, UpdateArticleRequest, UpdateArticleResponse,
};
use serde::de::DeserializeOwned;

use crate::application::articles::{CreateArticleCommand, UpdateArticleCommand};
use crate::domain::entities::ArticleRecord;

use super::error::ApiError;
use super::state::AppState;

pub async fn list_articles(
    State(state): State<AppState>,
) -> Result<Json<Vec<AdminArticleView>>, ApiError> {
    let articles = state.articles.list_articles().await?;
    Ok(Json(articles.into_iter().map(admin_view).collect()))
}

pub async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AdminArticleView>, ApiError> {
    let article = state.articles.get_article(parse_id(&id)?).await?;
    Ok(Json(admin_view(article)))
}

pub async fn create_article(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request: CreateArticleRequest = parse_body(&body)?;
    let article = state
        .articles
        .create_article(CreateArticleCommand {
            title: request.title,
            content: request.content,
            section_id: request.section_id,
        })
        .await?;

    let response = CreateArticleResponse {
        id: article.id,
        slug: article.slug,
        created_at: article.created_at,
        updated_at: article.updated_at,
    };
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

pub async fn update_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<UpdateArticleResponse>, ApiError> {
    let id = parse_id(&id)?;
    let request: UpdateArticleRequest = parse_body(&body)?;
    let article = state
        .articles
        .update_article(
            id,
            UpdateArticleCommand {
                title: request.title,
                content: request.content,
                section_id: request.section_id,
                excerpt: request.excerpt,
                is_pinned: request.is_pinned,
            },
        )
        .await?;

    Ok(Json(UpdateArticleResponse {
        id: article.id,
        updated_at: article.updated_at,
    }))
}

/// An empty body publishes "now".
pub async fn publish_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<PublishResponse>, ApiError> {
    let id = parse_id(&id)?;
    let request: PublishRequest = if body.iter().all(u8::is_ascii_whitespace) {
        PublishRequest::default()
    } else {
        parse_body(&body)?
    };

    let outcome = state
        .articles
        .publish_article(id, request.published_at)
        .await?;
    let article = outcome.article;
    let published_at = article.published_at.ok_or_else(|| {
        ApiError::new(
            "infra::http::admin",
            StatusCode::INTERNAL_SERVER_ERROR,
            "Publish did not record a timestamp",
        )
    })?;

    Ok(Json(PublishResponse {
        id: article.id,
        title: article.title,
        slug: article.slug,
        published_at,
        updated_at: article.updated_at,
        status: PUBLISHED_STATUS.to_string(),
        warning: outcome.warning,
    }))
}

/// Non-numeric ids cannot name an article.
fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>()
        .map_err(|_| ApiError::not_found("Article not found"))
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|err| {
        ApiError::with_detail(
            "infra::http::admin",
            StatusCode::BAD_REQUEST,
            "Invalid JSON body",
            &err,
        )
    })
}

fn admin_view(article: ArticleRecord) -> AdminArticleView {
    let status = if article.is_published() {
        ArticleStatus::Published
    } else {
        ArticleStatus::Draft
    };
    AdminArticleView {
        id: article.id,
        title: article.title,
        slug: article.slug,
        excerpt: article.excerpt,
        content: article.content,
        section_id: article.section_id,
        is_pinned: article.is_pinned,
        status,
        published_at: article.published_at,
        created_at: article.created_at,
        updated_at: article.updated_at,
    }
}
