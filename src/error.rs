use std::collections::BTreeMap;
use std::fmt;

use opentelemetry_semantic_conventions::{attribute::OTEL_STATUS_CODE, trace::ERROR_TYPE};
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde::{Serialize, Serializer};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{Span, error, warn};

pub const UNAUTHENTICATED_MSG: &str = "This operation is not authorized. Please, log in.";
pub const FORBIDDEN_MSG: &str = "This operation is not authorized.";
pub const INVALID_CREDENTIALS_MSG: &str = "Bad username or password";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldError {
    Required,
    BadFormat,
    BadValue,
}

impl FieldError {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldError::Required => "REQUIRED",
            FieldError::BadFormat => "BAD FORMAT",
            FieldError::BadValue => "BAD VALUE",
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FieldError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

pub type FieldErrors = BTreeMap<String, FieldError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{}", UNAUTHENTICATED_MSG)]
    Unauthenticated,

    #[error("{}", FORBIDDEN_MSG)]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("Bad request: {0:?}")]
    BadRequest(FieldErrors),

    #[error("{}", INVALID_CREDENTIALS_MSG)]
    InvalidCredentials,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(entity: &str, id: &str) -> Self {
        AppError::NotFound(format!("{} with id '{}' not found.", entity, id))
    }

    pub fn bad_request(field: &str, reason: FieldError) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), reason);
        AppError::BadRequest(errors)
    }

    /// Structured body handed to the client. Infrastructure failures never leak
    /// driver details.
    pub fn payload(&self) -> Value {
        match self {
            AppError::Unauthenticated | AppError::Forbidden | AppError::InvalidCredentials => {
                json!({ "msg": self.to_string() })
            }
            AppError::NotFound(msg) => json!({ "msg": msg }),
            AppError::BadRequest(errors) => json!(errors),
            AppError::Database(_) | AppError::Internal(_) => {
                json!({ "msg": "Internal server error" })
            }
        }
    }

    pub fn log_and_record(&self, ctx: &str) {
        let current_span = Span::current();
        let is_valid_span = !current_span.is_none();

        let message = self.to_string();
        let error_kind = match self {
            AppError::Database(err) => {
                error!(error = %message, context = %ctx, db_error = %err, "Database error");
                "database_error"
            }
            AppError::Unauthenticated => {
                warn!(context = %ctx, "Unauthenticated request");
                "unauthenticated_error"
            }
            AppError::Forbidden => {
                warn!(context = %ctx, "Forbidden request");
                "authorization_error"
            }
            AppError::NotFound(msg) => {
                warn!(message = %msg, context = %ctx, "Not found error");
                "not_found_error"
            }
            AppError::BadRequest(errors) => {
                warn!(fields = ?errors, context = %ctx, "Validation error");
                "validation_error"
            }
            AppError::InvalidCredentials => {
                warn!(context = %ctx, "Invalid credentials");
                "authentication_error"
            }
            AppError::Internal(msg) => {
                error!(message = %msg, context = %ctx, "Internal server error");
                "internal_error"
            }
        };

        if is_valid_span {
            current_span.record("error", tracing::field::display(true));
            current_span.record(ERROR_TYPE, tracing::field::display(error_kind));
            current_span.record("error.message", tracing::field::display(&message));

            if matches!(self, AppError::Database(_) | AppError::Internal(_)) {
                current_span.record(OTEL_STATUS_CODE, tracing::field::display("ERROR"));
            }
        }
    }

    pub fn status_code(&self) -> Status {
        match self {
            AppError::Database(_) => Status::InternalServerError,
            AppError::Unauthenticated => Status::Unauthorized,
            AppError::Forbidden => Status::Forbidden,
            AppError::NotFound(_) => Status::NotFound,
            AppError::BadRequest(_) => Status::BadRequest,
            AppError::InvalidCredentials => Status::Unauthorized,
            AppError::Internal(_) => Status::InternalServerError,
        }
    }

    pub fn to_status_with_log(&self, context: &str) -> Status {
        self.log_and_record(context);
        self.status_code()
    }
}

impl<'r> rocket::response::Responder<'r, 'static> for AppError {
    fn respond_to(self, req: &'r rocket::Request<'_>) -> rocket::response::Result<'static> {
        let status = self.to_status_with_log(&format!("Request to {} {}", req.method(), req.uri()));
        Custom(status, Json(self.payload())).respond_to(req)
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> Self {
        AppError::Internal(format!("Cryptography error: {}", error))
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(error: sqlx::migrate::MigrateError) -> Self {
        AppError::Internal(format!("Migration error: {}", error))
    }
}
