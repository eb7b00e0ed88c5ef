use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};

/// Application-wide Result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Main application error type
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    /// Validation errors for business rules
    #[error("Validation error: {0}")]
    Validation(String),

    /// Database operation errors, tagged with the operation that failed
    #[error("Database error during {operation}: {source}")]
    Database {
        operation: String,
        #[source]
        source: sqlx::Error,
    },

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// A singleton lookup matched more than one row
    #[error("Integrity error: {0}")]
    TooManyRows(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();
        let error_message = self.to_string();

        HttpResponse::build(status_code).json(serde_json::json!({
            "error": {
                "message": error_message,
                "code": status_code.as_u16(),
            }
        }))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Database { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::TooManyRows(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Json(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Helper functions for common error scenarios
impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn database(operation: impl Into<String>, source: sqlx::Error) -> Self {
        AppError::Database {
            operation: operation.into(),
            source,
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        AppError::NotFound(resource.into())
    }

    pub fn too_many_rows(msg: impl Into<String>) -> Self {
        AppError::TooManyRows(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}
