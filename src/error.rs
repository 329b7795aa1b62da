//!
//! # Custom Error Handling
//!
//! This module defines the custom error type `AppError` used throughout the
//! application. It centralizes error management, providing a consistent way to
//! represent the conditions the HTTP layer can surface, from storage failures
//! to validation and authentication problems.
//!
//! `AppError` implements `actix_web::error::ResponseError` to seamlessly convert
//! application errors into appropriate HTTP responses with JSON bodies.
//! `From` implementations for `sqlx::Error`, `validator::ValidationErrors`,
//! `bcrypt::BcryptError`, the token codec's `TokenError` and the stores'
//! `StoreError` allow handlers to propagate failures with the `?` operator.

use actix_web::{error::ResponseError, HttpResponse};
use serde_json::json;
use std::fmt;
use validator::ValidationErrors;

use crate::auth::token::TokenError;
use crate::store::StoreError;

/// Represents all possible errors that can occur within the application.
///
/// Each variant corresponds to a specific type of error, carrying a message
/// detailing the issue. These errors are then converted into HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Represents an unauthenticated or failed-authentication request (HTTP 401).
    /// Used for missing/invalid/expired session tokens and for login failures.
    Unauthorized(String),
    /// Represents a client-side error due to a malformed or invalid request (HTTP 400).
    BadRequest(String),
    /// Represents a uniqueness conflict, e.g. an already-registered email (HTTP 409).
    Conflict(String),
    /// Represents a situation where a requested resource was not found (HTTP 404).
    NotFound(String),
    /// Represents an unexpected server-side error (HTTP 500).
    InternalServerError(String),
    /// Represents an error originating from the persistence layer (HTTP 500).
    DatabaseError(String),
    /// Represents an error due to failed input validation (HTTP 422 Unprocessable Entity).
    /// Wraps errors from the `validator` crate.
    ValidationError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database Error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
        }
    }
}

/// Converts `AppError` variants into `HttpResponse` objects.
///
/// This implementation allows Actix Web to automatically translate `AppError`
/// results from handlers into the correct HTTP status codes and JSON bodies.
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Unauthorized(msg) => HttpResponse::Unauthorized().json(json!({
                "error": msg
            })),
            AppError::BadRequest(msg) => HttpResponse::BadRequest().json(json!({
                "error": msg
            })),
            AppError::Conflict(msg) => HttpResponse::Conflict().json(json!({
                "error": msg
            })),
            AppError::NotFound(msg) => HttpResponse::NotFound().json(json!({
                "error": msg
            })),
            AppError::InternalServerError(msg) => HttpResponse::InternalServerError().json(json!({
                "error": msg
            })),
            // Database errors are presented as generic internal server errors to the client.
            AppError::DatabaseError(_) => HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            })),
            AppError::ValidationError(msg) => HttpResponse::UnprocessableEntity().json(json!({
                "error": msg
            })),
        }
    }
}

/// Converts `sqlx::Error` into `AppError`.
///
/// `sqlx::Error::RowNotFound` maps to `AppError::NotFound`, while other
/// database errors become `AppError::DatabaseError`.
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> AppError {
        match error {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".into()),
            _ => AppError::DatabaseError(error.to_string()),
        }
    }
}

/// Converts `validator::ValidationErrors` into `AppError::ValidationError`.
///
/// The detailed validation messages are preserved.
impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        AppError::ValidationError(error.to_string())
    }
}

/// Converts `bcrypt::BcryptError` into `AppError::InternalServerError`.
///
/// This handles errors during password hashing or verification.
impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        AppError::InternalServerError(error.to_string())
    }
}

/// Converts a token verification failure into `AppError::Unauthorized`.
///
/// All three failure modes (malformed, bad signature, expired) collapse to a
/// 401 at the HTTP boundary; the distinction only matters to callers of the
/// codec itself.
impl From<TokenError> for AppError {
    fn from(error: TokenError) -> AppError {
        match error {
            TokenError::Encoding(msg) => AppError::InternalServerError(msg),
            other => AppError::Unauthorized(format!("Invalid token: {}", other)),
        }
    }
}

/// Converts store failures into their transport-level equivalents.
///
/// Login does NOT use this conversion: it matches on `StoreError` explicitly
/// so that `NotFound` and `PasswordMismatch` collapse into one generic
/// message. Everywhere else the mapping below applies.
impl From<StoreError> for AppError {
    fn from(error: StoreError) -> AppError {
        match error {
            StoreError::EmailTaken => AppError::Conflict("Email already registered".into()),
            StoreError::NotFound => AppError::NotFound("Record not found".into()),
            StoreError::PasswordMismatch => {
                AppError::BadRequest("Current password is incorrect".into())
            }
            StoreError::Hash(msg) => AppError::InternalServerError(msg),
            StoreError::Storage(msg) => AppError::DatabaseError(msg),
        }
    }
}
