// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::OnceLock;

use crate::ai::AiError;
use crate::auth::{JwtError, PasswordError};
use crate::database::DatabaseError;
use crate::email::MailError;
use crate::storage::StorageError;

static EXPOSE_INTERNAL_DETAILS: OnceLock<bool> = OnceLock::new();

/// Whether 500 responses carry the underlying error text. Set once at startup
/// from the environment; defaults to hidden.
pub fn expose_internal_details(enabled: bool) {
    let _ = EXPOSE_INTERNAL_DETAILS.set(enabled);
}

fn internal_details_exposed() -> bool {
    EXPOSE_INTERNAL_DETAILS.get().copied().unwrap_or(false)
}

/// A single failed field in a validation error
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        field_errors: Vec<FieldError>,
    },
    InvalidJson(String),
    /// Business-rule conflict reported as 400 with a machine readable code
    Duplicate {
        code: &'static str,
        message: String,
    },

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 413 Payload Too Large
    PayloadTooLarge(String),

    // 429 Too Many Requests
    TooManyRequests(String),

    // 500 Internal Server Error
    InternalServerError {
        message: String,
        detail: Option<String>,
    },

    // 502 Bad Gateway (external service issues)
    BadGateway(String),

    // 503 Service Unavailable
    ServiceUnavailable {
        message: String,
        retryable: bool,
        suggested_retry_delay_ms: Option<u64>,
    },
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError { .. } => 400,
            ApiError::InvalidJson(_) => 400,
            ApiError::Duplicate { .. } => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::PayloadTooLarge(_) => 413,
            ApiError::TooManyRequests(_) => 429,
            ApiError::InternalServerError { .. } => 500,
            ApiError::BadGateway(_) => 502,
            ApiError::ServiceUnavailable { .. } => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::InvalidJson(msg) => msg,
            ApiError::Duplicate { message, .. } => message,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::PayloadTooLarge(msg) => msg,
            ApiError::TooManyRequests(msg) => msg,
            ApiError::InternalServerError { message, .. } => message,
            ApiError::BadGateway(msg) => msg,
            ApiError::ServiceUnavailable { message, .. } => message,
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        let mut response = json!({
            "success": false,
            "message": self.message(),
            "error": self.error_code()
        });

        match self {
            ApiError::ValidationError { field_errors, .. } if !field_errors.is_empty() => {
                response["errors"] = json!(field_errors);
            }
            ApiError::InternalServerError { detail: Some(detail), .. } if internal_details_exposed() => {
                response["detail"] = json!(detail);
            }
            ApiError::ServiceUnavailable { retryable, suggested_retry_delay_ms, .. } => {
                response["retryable"] = json!(retryable);
                if let Some(delay) = suggested_retry_delay_ms {
                    response["suggestedRetryDelay"] = json!(delay);
                }
            }
            _ => {}
        }

        response
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::Duplicate { code, .. } => code,
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ApiError::TooManyRequests(_) => "TOO_MANY_REQUESTS",
            ApiError::InternalServerError { .. } => "INTERNAL_SERVER_ERROR",
            ApiError::BadGateway(_) => "BAD_GATEWAY",
            ApiError::ServiceUnavailable { .. } => "SERVICE_UNAVAILABLE",
        }
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(message: impl Into<String>, field_errors: Vec<FieldError>) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors,
        }
    }

    /// Validation failure on a single field
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        ApiError::ValidationError {
            message: message.clone(),
            field_errors: vec![FieldError::new(field, message)],
        }
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn duplicate(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::Duplicate {
            code,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        ApiError::PayloadTooLarge(message.into())
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        ApiError::TooManyRequests(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError {
            message: message.into(),
            detail: None,
        }
    }

    /// Generic 500 that keeps the underlying error for development responses
    pub fn internal(message: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        let message = message.into();
        tracing::error!("{}: {}", message, detail);
        ApiError::InternalServerError {
            message,
            detail: Some(detail.to_string()),
        }
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        ApiError::BadGateway(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable {
            message: message.into(),
            retryable: false,
            suggested_retry_delay_ms: None,
        }
    }

    pub fn retryable(message: impl Into<String>, suggested_retry_delay_ms: u64) -> Self {
        ApiError::ServiceUnavailable {
            message: message.into(),
            retryable: true,
            suggested_retry_delay_ms: Some(suggested_retry_delay_ms),
        }
    }
}

// Convert other error types to ApiError
impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            DatabaseError::UniqueViolation(constraint) => {
                // Races past the service-level checks land here
                tracing::warn!("Unique constraint violated: {}", constraint);
                let (code, message) = duplicate_for_constraint(&constraint);
                ApiError::duplicate(code, message)
            }
            DatabaseError::ConfigMissing(_) | DatabaseError::InvalidDatabaseUrl => {
                ApiError::internal("Database is not configured", err)
            }
            DatabaseError::Migration(e) => {
                tracing::error!("Migration error: {}", e);
                ApiError::service_unavailable("Service is being updated, please try again later")
            }
            DatabaseError::Serialization(e) => ApiError::internal("Failed to read stored document", e),
            DatabaseError::Sqlx(sqlx_err) => {
                // Log the real error but return generic message
                ApiError::internal("Database error occurred", sqlx_err)
            }
        }
    }
}

fn duplicate_for_constraint(constraint: &str) -> (&'static str, &'static str) {
    if constraint.contains("roll_number") {
        ("DUPLICATE_ROLL_NUMBER", "Roll number already exists in this division")
    } else if constraint.contains("uid") {
        ("DUPLICATE_UID", "UID already exists in this division")
    } else if constraint.contains("standards") {
        ("DUPLICATE_STANDARD", "A standard with this name already exists")
    } else if constraint.contains("divisions") {
        ("DUPLICATE_DIVISION", "Division already exists for this standard")
    } else if constraint.contains("submissions") {
        ("ALREADY_SUBMITTED", "Student has already taken this test")
    } else if constraint.contains("email") {
        ("DUPLICATE_EMAIL", "Teacher with this email already exists")
    } else {
        ("DUPLICATE", "Record already exists")
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut field_errors: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                let field = field.to_string();
                errs.iter().map(move |e| {
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is invalid ({})", field, e.code));
                    FieldError::new(field.clone(), message)
                })
            })
            .collect();
        field_errors.sort_by(|a, b| a.field.cmp(&b.field));

        let message = field_errors
            .first()
            .map(|e| e.message.clone())
            .unwrap_or_else(|| "Validation failed".to_string());
        ApiError::validation_error(message, field_errors)
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired | JwtError::Invalid(_) => ApiError::unauthorized("Token is not valid"),
            JwtError::InvalidSecret | JwtError::TokenGeneration(_) => {
                ApiError::internal("Failed to issue token", err)
            }
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::Weak(msg) => ApiError::invalid_field("password", msg),
            PasswordError::Hash(e) => ApiError::internal("Failed to process password", e),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotConfigured => ApiError::service_unavailable("File storage is not configured"),
            other => ApiError::internal("File storage operation failed", other),
        }
    }
}

impl From<AiError> for ApiError {
    fn from(err: AiError) -> Self {
        match err {
            AiError::NotConfigured => ApiError::service_unavailable("AI service is not configured"),
            AiError::Unavailable(msg) => {
                tracing::warn!("AI service unavailable after retries: {}", msg);
                ApiError::retryable(
                    "AI service is temporarily overloaded. Please try again in a few minutes.",
                    60_000,
                )
            }
            AiError::InvalidResponse(msg) => ApiError::internal("Failed to parse AI response", msg),
            other => ApiError::internal("Failed to generate MCQs", other),
        }
    }
}

impl From<MailError> for ApiError {
    fn from(err: MailError) -> Self {
        ApiError::internal("Failed to send email", err)
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_errors_are_bad_requests_with_codes() {
        let err = ApiError::duplicate("DUPLICATE_ROLL_NUMBER", "Roll number already exists in this division");
        assert_eq!(err.status_code(), 400);

        let body = err.to_json();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "DUPLICATE_ROLL_NUMBER");
        assert_eq!(body["message"], "Roll number already exists in this division");
    }

    #[test]
    fn validation_errors_list_fields() {
        let err = ApiError::invalid_field("duration", "Duration must be between 15 and 300 minutes");
        let body = err.to_json();
        assert_eq!(body["error"], "VALIDATION_ERROR");
        assert_eq!(body["errors"][0]["field"], "duration");
    }

    #[test]
    fn retryable_errors_carry_retry_hint() {
        let body = ApiError::retryable("overloaded", 60_000).to_json();
        assert_eq!(body["retryable"], true);
        assert_eq!(body["suggestedRetryDelay"], 60_000);
    }

    #[test]
    fn internal_detail_hidden_by_default() {
        let err = ApiError::internal("Database error occurred", "relation \"students\" does not exist");
        assert_eq!(err.status_code(), 500);
        assert!(err.to_json().get("detail").is_none());
    }

    #[test]
    fn unique_violations_map_to_codes() {
        let err: ApiError = DatabaseError::UniqueViolation("students_roll_number_active_idx".to_string()).into();
        assert_eq!(err.error_code(), "DUPLICATE_ROLL_NUMBER");
        let err: ApiError = DatabaseError::UniqueViolation("students_uid_active_idx".to_string()).into();
        assert_eq!(err.error_code(), "DUPLICATE_UID");
    }
}
