use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Db(sqlx::Error),
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Invalid date '{0}'. Use YYYY-MM-DD")]
    InvalidDate(String),
    #[error("Invalid range: start date {start} is after end date {end}")]
    InvalidRange { start: String, end: String },
    #[error("Duplicate record: post_id '{post_id}' with type '{source_type}' already exists")]
    DuplicateKey {
        post_id: String,
        source_type: String,
    },
    #[error("Not found")]
    NotFound,
    #[error("External error: {0}")]
    External(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, detail) = match &self {
            AppError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::Validation(_) | AppError::InvalidDate(_) | AppError::InvalidRange { .. } => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            AppError::DuplicateKey { .. } => (StatusCode::CONFLICT, self.to_string()),
            AppError::StorageUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
            AppError::External(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            AppError::Db(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };
        (status, Json(serde_json::json!({ "detail": detail }))).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(value: sqlx::Error) -> Self {
        match &value {
            // Unique violations are mapped with full key context inside the
            // store before this catch-all runs; this arm keeps the status right
            // if one slips through another path.
            sqlx::Error::Database(db) if db.is_unique_violation() => AppError::DuplicateKey {
                post_id: String::new(),
                source_type: String::new(),
            },
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                AppError::StorageUnavailable(value.to_string())
            }
            _ => AppError::Db(value),
        }
    }
}

impl From<String> for AppError {
    fn from(value: String) -> Self {
        AppError::Validation(value)
    }
}
