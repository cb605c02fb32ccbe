//! Typed errors, HTTP mapping, and mode-aware error reporting.

use crate::config::RunMode;
use axum::{
    extract::rejection::{FormRejection, JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Message returned in place of server-side failures when running in production mode.
pub const GENERIC_ERROR_MESSAGE: &str = "an internal error occurred";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing setting: {0}")]
    Missing(&'static str),
    #[error("invalid setting {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Table metadata could not be resolved from the catalog.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("table not found: {0}")]
    UnknownTable(String),
    #[error("catalog lookup failed for {table}: {reason}")]
    Catalog { table: String, reason: String },
}

#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("policy file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("policy file {path}: {source}")]
    Format {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("primary key not defined for table {0}")]
    NoPrimaryKey(String),
    #[error("database: {0}")]
    Execution(#[from] sqlx::Error),
    #[error(transparent)]
    Policy(#[from] PolicyError),
    #[error("{0}")]
    Authorization(String),
    #[error("authentication required")]
    Unauthenticated,
    #[error("validation: {0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),
}

impl AppError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::Schema(SchemaError::UnknownTable(_)) => (StatusCode::NOT_FOUND, "unknown_table"),
            AppError::Schema(SchemaError::Catalog { .. }) => (StatusCode::INTERNAL_SERVER_ERROR, "schema_error"),
            AppError::NoPrimaryKey(_) => (StatusCode::UNPROCESSABLE_ENTITY, "no_primary_key"),
            AppError::Execution(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            AppError::Policy(_) => (StatusCode::INTERNAL_SERVER_ERROR, "policy_error"),
            AppError::Authorization(_) => (StatusCode::FORBIDDEN, "access_denied"),
            AppError::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::MethodNotAllowed(_) => (StatusCode::METHOD_NOT_ALLOWED, "method_not_allowed"),
            AppError::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large"),
        }
    }

    /// Extractor rejection, keeping the body-limit status apart from malformed input.
    fn rejected(status: StatusCode, text: String) -> Self {
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(text)
        } else {
            AppError::BadRequest(text)
        }
    }
}

macro_rules! from_rejection {
    ($($rejection:ty),+ $(,)?) => {
        $(
            impl From<$rejection> for AppError {
                fn from(e: $rejection) -> Self {
                    AppError::rejected(e.status(), e.body_text())
                }
            }
        )+
    };
}

from_rejection!(QueryRejection, FormRejection, JsonRejection);

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// Renders `AppError`s as JSON responses. Server-side failures are always logged; their text
/// only reaches the client in development mode.
#[derive(Clone, Copy, Debug, Default)]
pub struct ErrorReporter {
    mode: RunMode,
}

impl ErrorReporter {
    pub const fn new(mode: RunMode) -> Self {
        ErrorReporter { mode }
    }

    pub fn render(&self, err: AppError) -> Response {
        let (status, code) = err.status_and_code();
        let message = if status.is_server_error() {
            tracing::error!(code, error = %err, "request failed");
            match self.mode {
                RunMode::Production => GENERIC_ERROR_MESSAGE.to_string(),
                RunMode::Development => err.to_string(),
            }
        } else {
            tracing::debug!(code, error = %err, "request rejected");
            err.to_string()
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }

    pub fn respond(&self, result: Result<Response, AppError>) -> Response {
        match result {
            Ok(resp) => resp,
            Err(err) => self.render(err),
        }
    }
}

/// Used where no reporter is in reach (extractor rejections); renders as production.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        ErrorReporter::new(RunMode::Production).render(self)
    }
}
