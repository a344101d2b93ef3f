use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::db::DbError;
use crate::recommend::RecommendError;

/// Request-level failures. Each one ends the current request with a
/// user-visible message; none is retried.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Product not found: {0}")]
    NotFound(String),
    #[error("Recommendation model doesn't contain this product: {0}")]
    ModelCoverageGap(String),
    #[error("Username already exists: {0}")]
    DuplicateUsername(String),
    #[error("Incorrect username or password")]
    InvalidCredentials,
    #[error("Already exists: {0}")]
    IntegrityViolation(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Database(DbError),
}

impl From<DbError> for AppError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(what) => AppError::NotFound(what),
            DbError::AlreadyExists(what) => AppError::IntegrityViolation(what),
            DbError::InvalidCredentials => AppError::InvalidCredentials,
            other => AppError::Database(other),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl From<RecommendError> for AppError {
    fn from(e: RecommendError) -> Self {
        match e {
            RecommendError::NotFound(name) => AppError::NotFound(name),
            RecommendError::ModelCoverageGap(name) => AppError::ModelCoverageGap(name),
            RecommendError::Catalog(e) => e.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::ModelCoverageGap(_) => (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()),
            AppError::DuplicateUsername(_) | AppError::IntegrityViolation(_) => {
                (StatusCode::CONFLICT, self.to_string())
            }
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::InvalidInput(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Database(ref e) => {
                // Driver details stay in the log.
                error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({ "error": message }));

        if status == StatusCode::UNAUTHORIZED {
            return (
                status,
                [(header::WWW_AUTHENTICATE, "Basic realm=\"skincare\"")],
                body,
            )
                .into_response();
        }

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
