use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid test type: {0}")]
    InvalidTestKind(String),

    #[error("Invalid question type: {0}")]
    InvalidQuestionKind(String),

    #[error("Invalid test structure: {0}")]
    FailedValidation(String),

    #[error("Invalid user answer: {0}")]
    FailedAnswerValidation(String),

    #[error("Missing answer for required question {0}")]
    MissingRequiredAnswer(i64),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not implemented: {0}")]
    Unimplemented(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable machine-readable code sent alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidTestKind(_) => "INVALID_TEST_TYPE",
            Error::InvalidQuestionKind(_) => "INVALID_QUESTION_TYPE",
            Error::FailedValidation(_) => "INVALID_TEST_STRUCTURE",
            Error::FailedAnswerValidation(_) => "INVALID_USER_ANSWER",
            Error::MissingRequiredAnswer(_) => "MISSING_REQUIRED_ANSWER",
            Error::BadRequest(_) | Error::Validation(_) | Error::Json(_) => "FAILED_VALIDATION",
            Error::Unauthorized(_) => "UNAUTHORIZED",
            Error::Forbidden(_) => "FORBIDDEN",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Unimplemented(_) => "NOT_IMPLEMENTED",
            _ => "INTERNAL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::InvalidTestKind(_)
            | Error::InvalidQuestionKind(_)
            | Error::FailedValidation(_)
            | Error::FailedAnswerValidation(_)
            | Error::MissingRequiredAnswer(_)
            | Error::BadRequest(_)
            | Error::Validation(_)
            | Error::Json(_) => StatusCode::BAD_REQUEST,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Unimplemented(_) => StatusCode::NOT_IMPLEMENTED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let code = self.code();
        let error_message = match &self {
            Error::Database(err) => {
                tracing::error!(error = ?err, "database error");
                "An unexpected error occurred".to_string()
            }
            Error::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                "An unexpected error occurred".to_string()
            }
            Error::Config(_) | Error::Anyhow(_) | Error::Io(_) => {
                tracing::error!(error = %self, "unexpected error");
                "An unexpected error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({ "error": error_message, "code": code }));
        (status, body).into_response()
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::BadRequest(rejection.body_text())
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::NotFound("Resource not found".to_string()),
            other => Error::Database(other),
        }
    }
}
