mod support;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use quire::cache::STALE_CACHE_WARNING;

use support::{TOKEN, app_with, limit, settings};

async fn app() -> Router {
    app_with(settings()).await
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

async fn send(app: &Router, request: Request<Body>) -> Reply {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    Reply {
        status,
        headers,
        body,
    }
}

fn get(path: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .body(Body::empty())
        .expect("request")
}

fn admin(method: Method, path: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(path)
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"));
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request")
}

async fn create(app: &Router, title: &str) -> i64 {
    let reply = send(
        app,
        admin(
            Method::POST,
            "/api/admin/articles",
            Some(json!({ "title": title, "content": "Body text", "section_id": 1 })),
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{:?}", reply.body);
    reply.body["id"].as_i64().expect("id")
}

#[tokio::test]
async fn health_reports_no_content() {
    let app = app().await;
    let reply = send(&app, get("/api/health")).await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn unknown_article_returns_json_404() {
    let app = app().await;
    let reply = send(&app, get("/api/articles/nope")).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body, json!({ "error": "Article not found", "status": 404 }));
}

#[tokio::test]
async fn unknown_section_returns_json_404() {
    let app = app().await;
    let reply = send(&app, get("/api/sections/no-such-section/articles")).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body, json!({ "error": "Section not found", "status": 404 }));
}

#[tokio::test]
async fn unknown_route_falls_back_to_404() {
    let app = app().await;
    let reply = send(&app, get("/api/nothing-here")).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["status"], 404);
}

#[tokio::test]
async fn admin_routes_require_token() {
    let app = app().await;
    let request = Request::builder()
        .uri("/api/admin/articles")
        .header(header::AUTHORIZATION, "Bearer wrong")
        .body(Body::empty())
        .expect("request");
    let reply = send(&app, request).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["error"], "Unauthorized");

    let reply = send(&app, get("/api/admin/articles")).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_rejects_missing_fields_and_bad_json() {
    let app = app().await;
    let reply = send(
        &app,
        admin(
            Method::POST,
            "/api/admin/articles",
            Some(json!({ "content": "no title", "section_id": 1 })),
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"], "title is required");

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/admin/articles")
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .body(Body::from("{not json"))
        .expect("request");
    let reply = send(&app, request).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"], "Invalid JSON body");
}

#[tokio::test]
async fn create_update_and_read_back() {
    let app = app().await;
    let id = create(&app, "Hello World").await;

    let reply = send(
        &app,
        admin(
            Method::PUT,
            &format!("/api/admin/articles/{id}"),
            Some(json!({ "content": "Edited" })),
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["id"], id);
    assert!(reply.body["updatedAt"].is_string());

    let reply = send(&app, admin(Method::GET, &format!("/api/admin/articles/{id}"), None)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["title"], "Hello World");
    assert_eq!(reply.body["content"], "Edited");
    assert_eq!(reply.body["status"], "draft");

    let reply = send(&app, admin(Method::GET, "/api/admin/articles/abc", None)).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn publish_keeps_first_timestamp() {
    let app = app().await;
    let id = create(&app, "Launch Notes").await;
    let path = format!("/api/admin/articles/{id}/publish");

    let first = send(
        &app,
        admin(
            Method::POST,
            &path,
            Some(json!({ "published_at": "2024-06-01T09:30:00Z" })),
        ),
    )
    .await;
    assert_eq!(first.status, StatusCode::OK, "{:?}", first.body);
    assert_eq!(first.body["status"], "published");
    assert_eq!(first.body["published_at"], "2024-06-01T09:30:00Z");
    assert_eq!(first.body["warning"], STALE_CACHE_WARNING);

    let second = send(
        &app,
        admin(
            Method::POST,
            &path,
            Some(json!({ "published_at": "2025-01-01T00:00:00Z" })),
        ),
    )
    .await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.body["published_at"], "2024-06-01T09:30:00Z");

    let missing = send(&app, admin(Method::POST, "/api/admin/articles/999/publish", None)).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn published_article_is_public_and_cacheable() {
    let app = app().await;
    let id = create(&app, "Public Piece").await;
    let slug = {
        let reply = send(&app, admin(Method::GET, &format!("/api/admin/articles/{id}"), None)).await;
        reply.body["slug"].as_str().expect("slug").to_string()
    };

    let hidden = send(&app, get(&format!("/api/articles/{slug}"))).await;
    assert_eq!(hidden.status, StatusCode::NOT_FOUND);

    let published = send(
        &app,
        admin(Method::POST, &format!("/api/admin/articles/{id}/publish"), None),
    )
    .await;
    assert_eq!(published.status, StatusCode::OK);

    let reply = send(&app, get(&format!("/api/articles/{slug}"))).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["title"], "Public Piece");
    assert_eq!(reply.body["section"]["slug"], "general");
    assert_eq!(
        reply.headers[header::CACHE_CONTROL],
        "public, max-age=3600"
    );

    let listing = send(&app, get("/api/sections/general/articles")).await;
    assert_eq!(listing.status, StatusCode::OK);
    let items = listing.body.as_array().expect("array");
    assert!(items.iter().any(|item| item["slug"] == slug.as_str()));

    let sections = send(&app, get("/api/sections")).await;
    assert_eq!(sections.status, StatusCode::OK);
    assert_eq!(sections.body[0]["slug"], "general");
}

#[tokio::test]
async fn admin_writes_are_rate_limited() {
    let mut settings = settings();
    settings.rate_limit.admin_write = limit(2);
    let app = app_with(settings).await;

    for _ in 0..2 {
        let reply = send(
            &app,
            admin(Method::POST, "/api/admin/articles", Some(json!({}))),
        )
        .await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    }

    let reply = send(
        &app,
        admin(Method::POST, "/api/admin/articles", Some(json!({}))),
    )
    .await;
    assert_eq!(reply.status, StatusCode::TOO_MANY_REQUESTS);
    assert!(reply.headers.contains_key(header::RETRY_AFTER));

    let read = send(&app, admin(Method::GET, "/api/admin/articles", None)).await;
    assert_eq!(read.status, StatusCode::OK);
}
