//!
//! # Custom Error Handling
//!
//! This module defines the error vocabulary used throughout the application.
//!
//! Business-rule violations are expressed as *domain errors*: small types that
//! implement the [`DomainError`] trait and therefore know which HTTP status
//! they map to. New kinds only need a new type implementing the trait; the
//! error-handling middleware classifies them through the trait object and
//! never needs to learn about the concrete type.
//!
//! Everything else (database failures, token encoding problems, hashing
//! errors) is an *unanticipated* fault. Those are always rendered as a generic
//! 500 response whose body never contains internal details, except when the
//! application runs in development and verbose diagnostics are enabled.
//!
//! `AppError` implements `actix_web::error::ResponseError` so handlers can
//! return it directly, and provides `From` conversions for the library errors
//! the application deals with, so `?` works across layers.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use utoipa::ToSchema;
use validator::ValidationErrors;

/// Message returned to clients for every unanticipated fault.
pub const INTERNAL_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// Message returned to clients when request validation fails.
pub const VALIDATION_ERROR_MESSAGE: &str = "One or more validation errors occurred";

/// An expected, named failure raised by application logic.
///
/// Implementations must map to exactly one HTTP status code and the mapping
/// must be pure: calling [`DomainError::to_http_status_code`] repeatedly on the
/// same value always yields the same number.
pub trait DomainError: fmt::Debug + fmt::Display + Send + Sync + 'static {
    /// Human-readable message that is safe to show to clients.
    fn message(&self) -> &str;

    /// The HTTP status code this error is surfaced with.
    fn to_http_status_code(&self) -> u16;
}

macro_rules! domain_error {
    (
        $(#[$meta:meta])*
        $name:ident => $status:expr, $default:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            message: String,
        }

        impl $name {
            /// Message used when the error is constructed with [`Default`].
            pub const DEFAULT_MESSAGE: &'static str = $default;

            /// Creates the error with an explicit client-facing message.
            pub fn new(message: impl Into<String>) -> Self {
                Self {
                    message: message.into(),
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new(Self::DEFAULT_MESSAGE)
            }
        }

        impl DomainError for $name {
            fn message(&self) -> &str {
                &self.message
            }

            fn to_http_status_code(&self) -> u16 {
                $status.as_u16()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str(&self.message)
            }
        }

        impl std::error::Error for $name {}

        impl From<$name> for AppError {
            fn from(error: $name) -> AppError {
                AppError::Domain(Box::new(error))
            }
        }
    };
}

domain_error! {
    /// Raised when the record an operation targets does not exist (or is not
    /// visible to the caller).
    ///
    /// Existing clients expect this to be reported as `400 Bad Request`, not
    /// `404 Not Found`.
    RecordNotFound => StatusCode::BAD_REQUEST,
        "The record you are trying to update is not found"
}

domain_error! {
    /// Raised when the caller has not proven its identity (HTTP 401).
    Unauthorized => StatusCode::UNAUTHORIZED,
        "Authentication is required to access this resource"
}

domain_error! {
    /// Raised when an authenticated caller lacks the required role (HTTP 403).
    Forbidden => StatusCode::FORBIDDEN,
        "You do not have permission to perform this action"
}

domain_error! {
    /// Raised when creating a record would violate a uniqueness rule (HTTP 409).
    DuplicateRecord => StatusCode::CONFLICT,
        "The record you are trying to create already exists"
}

domain_error! {
    /// Raised when no route matches the request path and method (HTTP 404).
    RouteNotFound => StatusCode::NOT_FOUND,
        "The requested resource does not exist"
}

/// Represents all possible errors that can occur within the application.
#[derive(Debug)]
pub enum AppError {
    /// A business-rule violation carrying its own status code.
    Domain(Box<dyn DomainError>),
    /// Input rejected by a validator (HTTP 422 Unprocessable Entity).
    Validation(ValidationErrors),
    /// A failure reported by the persistence layer.
    Database(sqlx::Error),
    /// A failure while encoding a JWT.
    Token(jsonwebtoken::errors::Error),
    /// A failure while hashing or verifying a password.
    Hashing(bcrypt::BcryptError),
    /// Any other unexpected server-side error.
    Internal(String),
}

/// How much detail an error response may reveal about unanticipated faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnostics {
    /// Internal error text is never written to the response.
    Redacted,
    /// Internal error text is added under `detail`. Development only.
    Verbose,
}

/// JSON body written for every error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Client-facing description of the failure.
    pub message: String,
    /// Field-level validation failures, when the request was rejected by a validator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub errors: Option<Value>,
    /// Internal error text. Only present in development.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            errors: None,
            detail: None,
        }
    }

    pub fn with_errors(mut self, errors: Value) -> Self {
        self.errors = Some(errors);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl AppError {
    /// Wraps any domain error without requiring a dedicated `From` impl.
    pub fn domain(error: impl DomainError) -> Self {
        AppError::Domain(Box::new(error))
    }

    /// Returns the domain error carried by this value, if any.
    pub fn as_domain(&self) -> Option<&dyn DomainError> {
        match self {
            AppError::Domain(error) => Some(error.as_ref()),
            _ => None,
        }
    }

    /// `true` for faults that are not expected business-rule violations.
    pub fn is_unanticipated(&self) -> bool {
        !matches!(self, AppError::Domain(_) | AppError::Validation(_))
    }

    /// Renders the error as an HTTP response.
    ///
    /// Rendering is pure; logging is left to the error-handling middleware.
    pub fn to_response(&self, diagnostics: Diagnostics) -> HttpResponse {
        let body = match self {
            AppError::Domain(error) => ErrorBody::new(error.message()),
            AppError::Validation(errors) => {
                let body = ErrorBody::new(VALIDATION_ERROR_MESSAGE);
                match serde_json::to_value(errors) {
                    Ok(errors) => body.with_errors(errors),
                    Err(_) => body,
                }
            }
            _ => {
                let body = ErrorBody::new(INTERNAL_ERROR_MESSAGE);
                match diagnostics {
                    Diagnostics::Verbose => body.with_detail(self.to_string()),
                    Diagnostics::Redacted => body,
                }
            }
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Domain(error) => write!(f, "{}", error),
            AppError::Validation(errors) => write!(f, "Validation Error: {}", errors),
            AppError::Database(error) => write!(f, "Database Error: {}", error),
            AppError::Token(error) => write!(f, "Token Error: {}", error),
            AppError::Hashing(error) => write!(f, "Password Hashing Error: {}", error),
            AppError::Internal(msg) => write!(f, "Internal Server Error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Validation(error) => Some(error),
            AppError::Database(error) => Some(error),
            AppError::Token(error) => Some(error),
            AppError::Hashing(error) => Some(error),
            AppError::Domain(_) | AppError::Internal(_) => None,
        }
    }
}

/// Converts `AppError` values into `HttpResponse` objects.
///
/// Without the error-handling middleware in front of a handler, this still
/// yields the same response shape, with diagnostics always redacted.
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Domain(error) => StatusCode::from_u16(error.to_http_status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        self.to_response(Diagnostics::Redacted)
    }
}

/// Converts `sqlx::Error` into `AppError`.
///
/// `RowNotFound` becomes [`RecordNotFound`] and unique-constraint violations
/// become [`DuplicateRecord`]; everything else is a database fault.
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> AppError {
        match error {
            sqlx::Error::RowNotFound => RecordNotFound::default().into(),
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                DuplicateRecord::default().into()
            }
            _ => AppError::Database(error),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        AppError::Validation(error)
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(error: jsonwebtoken::errors::Error) -> AppError {
        AppError::Token(error)
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        AppError::Hashing(error)
    }
}
