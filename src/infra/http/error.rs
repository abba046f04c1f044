use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use quire_api_types::ErrorBody;

use crate::application::articles::AdminArticleError;
use crate::application::error::ErrorReport;
use crate::application::repos::RepoError;
use crate::domain::error::DomainError;

/// JSON error response `{error, status}` carrying an [`ErrorReport`] for logging.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    report: ErrorReport,
}

impl ApiError {
    pub fn new(source: &'static str, status: StatusCode, message: impl Into<String>) -> Self {
        let message = message.into();
        let report = ErrorReport::from_message(source, status, message.clone());
        Self {
            status,
            message,
            report,
        }
    }

    /// Public message plus a private diagnostic that only reaches the logs.
    pub fn with_detail(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
        error: &dyn std::error::Error,
    ) -> Self {
        Self {
            status,
            message: message.into(),
            report: ErrorReport::from_error(source, status, error),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("infra::http", StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::new("infra::http::auth", StatusCode::UNAUTHORIZED, "Unauthorized")
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("infra::http", StatusCode::NOT_FOUND, message)
    }

    pub fn internal(source: &'static str, error: &dyn std::error::Error) -> Self {
        Self::with_detail(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
            error,
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn rate_limited(retry_after_secs: u64) -> Response {
        let mut response = Self::new(
            "infra::http::rate_limit",
            StatusCode::TOO_MANY_REQUESTS,
            "Too many requests",
        )
        .into_response();
        if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        response
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
            status: self.status.as_u16(),
        };
        let mut response = (self.status, Json(body)).into_response();
        self.report.attach(&mut response);
        response
    }
}

pub fn repo_to_api(source: &'static str, err: RepoError) -> ApiError {
    match err {
        RepoError::NotFound => ApiError::not_found("Not found"),
        RepoError::Duplicate { .. } => {
            ApiError::with_detail(source, StatusCode::CONFLICT, "Duplicate record", &err)
        }
        RepoError::InvalidInput { .. } => {
            ApiError::with_detail(source, StatusCode::BAD_REQUEST, "Invalid input", &err)
        }
        RepoError::Timeout => ApiError::with_detail(
            source,
            StatusCode::SERVICE_UNAVAILABLE,
            "Service temporarily unavailable",
            &err,
        ),
        RepoError::Persistence(_) => ApiError::internal(source, &err),
    }
}

impl From<AdminArticleError> for ApiError {
    fn from(err: AdminArticleError) -> Self {
        const SOURCE: &str = "application::articles";
        match err {
            AdminArticleError::NotFound => ApiError::not_found("Article not found"),
            AdminArticleError::UnknownSection(_) => ApiError::with_detail(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Unknown section",
                &err,
            ),
            AdminArticleError::Domain(DomainError::Validation { field, message }) => {
                ApiError::bad_request(format!("{field} {message}"))
            }
            AdminArticleError::Domain(DomainError::NotFound { .. }) => {
                ApiError::not_found("Not found")
            }
            AdminArticleError::Repo(repo) => repo_to_api(SOURCE, repo),
        }
    }
}
