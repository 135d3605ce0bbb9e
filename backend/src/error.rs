//! Error handling for the Kedai inventory back-office
//!
//! Provides consistent error responses in English and Bahasa Indonesia

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String, message_id: String },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    // Validation errors
    #[error("Validation error: {message}")]
    Validation {
        field: String,
        message: String,
        message_id: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid CSV: {message}")]
    InvalidCsv {
        /// 1-based physical line, `None` for header level problems
        line: Option<usize>,
        message: String,
    },

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Conflict: {message}")]
    Conflict {
        resource: String,
        message: String,
        message_id: String,
    },

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business logic errors
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    /// Field level validation failure from one of the shared validators
    pub fn invalid(field: &str, message: &str) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.to_string(),
            message_id: format!("Data tidak valid: {}", message),
        }
    }

    pub fn csv_line(line: usize, message: impl Into<String>) -> Self {
        AppError::InvalidCsv {
            line: Some(line),
            message: message.into(),
        }
    }

    pub fn csv_header(message: impl Into<String>) -> Self {
        AppError::InvalidCsv {
            line: None,
            message: message.into(),
        }
    }

    /// HTTP status this error is reported with
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidCredentials | AppError::InvalidToken | AppError::Unauthorized { .. } => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Validation { .. } | AppError::ValidationError(_) | AppError::InvalidCsv { .. } => {
                StatusCode::BAD_REQUEST
            }
            AppError::DuplicateEntry(_) | AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InsufficientStock { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Configuration(_)
            | AppError::DatabaseError(_)
            | AppError::Internal(_)
            | AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let (field, message) = errors
            .field_errors()
            .into_iter()
            .next()
            .map(|(field, errs)| {
                let message = errs
                    .first()
                    .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| format!("{} is invalid", field));
                (field.to_string(), message)
            })
            .unwrap_or_else(|| ("input".to_string(), "Invalid input".to_string()));
        AppError::invalid(&field, &message)
    }
}

/// Enum labels are only parsed from stored rows, so a bad one is a server fault
impl From<shared::ParseEnumError> for AppError {
    fn from(error: shared::ParseEnumError) -> Self {
        AppError::Internal(error.to_string())
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message_en: String,
    pub message_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorDetail {
    fn new(code: &str, message_en: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message_en: message_en.into(),
            message_id: message_id.into(),
            field: None,
        }
    }

    fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_detail = match &self {
            AppError::InvalidCredentials => ErrorDetail::new(
                "INVALID_CREDENTIALS",
                "Invalid email or password",
                "Email atau kata sandi salah",
            ),
            AppError::InvalidToken => {
                ErrorDetail::new("INVALID_TOKEN", "Invalid token", "Token tidak valid")
            }
            AppError::Unauthorized { message, message_id } => {
                ErrorDetail::new("UNAUTHORIZED", message.clone(), message_id.clone())
            }
            AppError::Forbidden(msg) => ErrorDetail::new(
                "FORBIDDEN",
                msg.clone(),
                "Anda tidak memiliki akses untuk tindakan ini",
            ),
            AppError::Validation {
                field,
                message,
                message_id,
            } => ErrorDetail::new("VALIDATION_ERROR", message.clone(), message_id.clone())
                .with_field(field.clone()),
            AppError::ValidationError(msg) => ErrorDetail::new(
                "VALIDATION_ERROR",
                msg.clone(),
                format!("Data tidak valid: {}", msg),
            ),
            AppError::InvalidCsv { line, message } => match line {
                Some(line) => ErrorDetail::new(
                    "INVALID_CSV",
                    format!("Line {}: {}", line, message),
                    format!("Baris {}: {}", line, message),
                )
                .with_field(format!("line:{}", line)),
                None => ErrorDetail::new(
                    "INVALID_CSV",
                    message.clone(),
                    format!("Format CSV tidak valid: {}", message),
                ),
            },
            AppError::DuplicateEntry(field) => ErrorDetail::new(
                "DUPLICATE_ENTRY",
                format!("A record with this {} already exists", field),
                format!("Data dengan {} ini sudah ada", field),
            )
            .with_field(field.clone()),
            AppError::Conflict {
                resource,
                message,
                message_id,
            } => ErrorDetail::new("CONFLICT", message.clone(), message_id.clone())
                .with_field(resource.clone()),
            AppError::NotFound(resource) => ErrorDetail::new(
                "NOT_FOUND",
                format!("{} not found", resource),
                format!("{} tidak ditemukan", resource),
            ),
            AppError::InsufficientStock {
                product,
                available,
                requested,
            } => ErrorDetail::new(
                "INSUFFICIENT_STOCK",
                format!(
                    "Insufficient stock for {}: available {}, requested {}",
                    product, available, requested
                ),
                format!(
                    "Stok {} tidak mencukupi: tersedia {}, diminta {}",
                    product, available, requested
                ),
            ),
            AppError::Timeout(operation) => ErrorDetail::new(
                "TIMEOUT",
                format!("{} took too long, no changes were saved", operation),
                format!("{} melebihi batas waktu, tidak ada perubahan yang disimpan", operation),
            ),
            AppError::Configuration(msg) => ErrorDetail::new(
                "CONFIGURATION_ERROR",
                format!("Configuration error: {}", msg),
                "Terjadi kesalahan konfigurasi server",
            ),
            AppError::DatabaseError(_) => ErrorDetail::new(
                "DATABASE_ERROR",
                "A database error occurred",
                "Terjadi kesalahan pada basis data",
            ),
            AppError::Internal(msg) => ErrorDetail::new(
                "INTERNAL_ERROR",
                msg.clone(),
                "Terjadi kesalahan internal server",
            ),
            AppError::InternalError(_) => ErrorDetail::new(
                "INTERNAL_ERROR",
                "An internal server error occurred",
                "Terjadi kesalahan internal server",
            ),
        };

        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
