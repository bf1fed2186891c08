//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Startup-time failures: connecting, reading the catalog, synthesizing schemas, resolving routes.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("connection: {0}")]
    Connection(String),
    #[error("permission denied reading catalog: {0}")]
    Permission(String),
    #[error("unsupported type: table {table} column {column} has type '{sql_type}'")]
    UnsupportedType {
        table: String,
        column: String,
        sql_type: String,
    },
    #[error("duplicate path segment '{segment}' for table {table}")]
    DuplicatePathSegment { segment: String, table: String },
    #[error("table {0} has no columns")]
    EmptyTable(String),
    #[error("catalog load: {0}")]
    Load(String),
    #[error("config: {0}")]
    Config(String),
}

impl CatalogError {
    /// Classify a failed connect or catalog query.
    pub fn from_sqlx(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) => match db.code().as_deref() {
                Some("42501") => CatalogError::Permission(db.message().to_string()),
                Some(code) if code.starts_with("08") || code.starts_with("28") || code == "3D000" => {
                    CatalogError::Connection(db.message().to_string())
                }
                _ => CatalogError::Load(e.to_string()),
            },
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::Configuration(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed => CatalogError::Connection(e.to_string()),
            _ => CatalogError::Load(e.to_string()),
        }
    }

    /// True when the failure concerns a single table; the rest of the catalog is still usable.
    pub fn is_table_scoped(&self) -> bool {
        matches!(
            self,
            CatalogError::UnsupportedType { .. }
                | CatalogError::DuplicatePathSegment { .. }
                | CatalogError::EmptyTable(_)
        )
    }
}

/// Every startup failure, reported once before any route is mounted.
#[derive(Error, Debug)]
#[error("startup failed: {}", .errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
pub struct StartupError {
    pub errors: Vec<CatalogError>,
}

impl From<CatalogError> for StartupError {
    fn from(e: CatalogError) -> Self {
        StartupError { errors: vec![e] }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("database: {0}")]
    Db(sqlx::Error),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),
    #[error("operation not allowed: {0}")]
    OperationNotAllowed(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::RowNotFound = e {
            return AppError::NotFound("row".into());
        }
        if let sqlx::Error::Database(db) = &e {
            let message = db.message().to_string();
            match db.code().as_deref() {
                Some("23505") | Some("23503") => return AppError::Conflict(message),
                Some("23502") | Some("23514") | Some("22P02") | Some("22003") | Some("22007")
                | Some("22008") | Some("22001") => return AppError::Validation(message),
                _ => {}
            }
        }
        AppError::Db(e)
    }
}

impl AppError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Catalog(_) => (StatusCode::INTERNAL_SERVER_ERROR, "catalog_error"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            AppError::Db(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large"),
            AppError::OperationNotAllowed(_) => (StatusCode::METHOD_NOT_ALLOWED, "operation_not_allowed"),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        // Server-side detail stays in the log.
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: None,
            },
        };
        (status, Json(body)).into_response()
    }
}
