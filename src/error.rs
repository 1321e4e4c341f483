use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::borrow::Cow;
use std::collections::BTreeMap;
use thiserror::Error;
use validator::{ValidationError, ValidationErrors};

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Template error: {0}")]
    Template(#[from] handlebars::RenderError),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Validation error: {0}")]
    ValidatorError(#[from] ValidationErrors),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Authentication(_) | AppError::Jwt(_) => StatusCode::UNAUTHORIZED,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::Validation(_) | AppError::ValidatorError(_) | AppError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_)
            | AppError::Migration(_)
            | AppError::Internal(_)
            | AppError::Serialization(_)
            | AppError::Template(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message that is safe to show to a client. Internal failures are
    /// logged here and replaced by a generic message.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                "Database error".to_string()
            }
            AppError::Migration(e) => {
                tracing::error!("Migration error: {}", e);
                "Database error".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            AppError::Serialization(e) => {
                tracing::error!("Serialization error: {}", e);
                "Serialization error".to_string()
            }
            AppError::Template(e) => {
                tracing::error!("Template error: {}", e);
                "Internal server error".to_string()
            }
            AppError::Jwt(e) => {
                tracing::debug!("JWT error: {}", e);
                "Invalid token".to_string()
            }
            AppError::ValidatorError(_) => "Validation failed".to_string(),
            AppError::Authentication(msg)
            | AppError::Authorization(msg)
            | AppError::Validation(msg)
            | AppError::NotFound(msg)
            | AppError::BadRequest(msg) => msg.clone(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AppError::Database(_) | AppError::Migration(_) => "DATABASE_ERROR",
            AppError::Authentication(_) => "AUTHENTICATION_ERROR",
            AppError::Authorization(_) => "AUTHORIZATION_ERROR",
            AppError::Validation(_) | AppError::ValidatorError(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Internal(_) | AppError::Template(_) => "INTERNAL_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Jwt(_) => "JWT_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut error = json!({
            "code": self.error_code(),
            "message": self.public_message(),
        });

        if let AppError::ValidatorError(e) = &self {
            error["details"] = json!(field_messages(e));
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

/// Flatten validator errors into `{field: [messages]}`.
pub fn field_messages(errors: &ValidationErrors) -> BTreeMap<String, Vec<String>> {
    errors
        .field_errors()
        .iter()
        .map(|(field, errors)| {
            (
                field.to_string(),
                errors
                    .iter()
                    .map(|e| match &e.message {
                        Some(message) => message.to_string(),
                        None => default_message(&e.code),
                    })
                    .collect(),
            )
        })
        .collect()
}

fn default_message(code: &str) -> String {
    match code {
        "url" => "Enter a valid URL.".to_string(),
        "length" => "Ensure this field has a valid length.".to_string(),
        "required" => "This field is required.".to_string(),
        _ => "Invalid value.".to_string(),
    }
}

// 便利函数，用于创建常见错误
impl AppError {
    pub fn not_found(resource: &str) -> Self {
        Self::NotFound(format!("{} not found", resource))
    }

    pub fn unauthorized(msg: &str) -> Self {
        Self::Authentication(msg.to_string())
    }

    pub fn forbidden(msg: &str) -> Self {
        Self::Authorization(msg.to_string())
    }

    pub fn bad_request(msg: &str) -> Self {
        Self::BadRequest(msg.to_string())
    }

    pub fn internal(msg: &str) -> Self {
        Self::Internal(msg.to_string())
    }

    /// Map a UNIQUE constraint failure to a field error, so a write that
    /// loses a race against the existence check still reads as invalid input.
    pub fn unique_violation(err: sqlx::Error, field: &'static str, message: &'static str) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => Self::field(field, message),
            _ => Self::Database(err),
        }
    }

    /// A single field-level validation failure.
    pub fn field(field: &'static str, message: impl Into<Cow<'static, str>>) -> Self {
        let mut errors = ValidationErrors::new();
        let mut error = ValidationError::new("invalid");
        error.message = Some(message.into());
        errors.add(field, error);
        Self::ValidatorError(errors)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(AppError::forbidden("no").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::not_found("Bookmark").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::unauthorized("no").status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::bad_request("no").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::field("url", "Enter a valid URL.").status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn field_error_keeps_message() {
        let AppError::ValidatorError(errors) = AppError::field("tags", "Unknown tag.") else {
            panic!("expected validator error");
        };
        let messages = field_messages(&errors);
        assert_eq!(messages["tags"], vec!["Unknown tag.".to_string()]);
    }

    #[test]
    fn internal_message_is_not_leaked() {
        let err = AppError::internal("connection string with password");
        assert_eq!(err.public_message(), "Internal server error");
    }
}
