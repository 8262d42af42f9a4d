use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::{json, Map, Value};
use sqlx::Error as SqlxError;
use std::env::VarError;
use thiserror::Error;
use validator::{ValidationErrors, ValidationErrorsKind};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid data")]
    Validation(#[from] ValidationErrors),

    #[error("Invalid request body: {0}")]
    BadPayload(String),

    #[error("Not found")]
    NotFound,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Upload rejected: {0}")]
    UploadRejected(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Internal server error")]
    InternalServerError,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    EnvVarError(#[from] VarError),

    #[error("SQLx error: {0}")]
    SqlxError(#[from] SqlxError),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::BadPayload(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::UploadRejected(_) => StatusCode::BAD_REQUEST,
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::EnvVarError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::SqlxError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = match self {
            AppError::Validation(errors) => {
                json!({ "message": self.to_string(), "errors": field_errors(errors) })
            }
            _ if status.is_server_error() => {
                log::error!("{}", self);
                json!({ "message": "Internal server error" })
            }
            _ => json!({ "message": self.to_string() }),
        };
        HttpResponse::build(status).json(body)
    }
}

/// Validation failures keyed by the JSON field names clients send.
fn field_errors(errors: &ValidationErrors) -> Value {
    let fields = errors
        .errors()
        .iter()
        .map(|(field, kind)| {
            let detail = match kind {
                ValidationErrorsKind::Field(errs) => json!(errs),
                ValidationErrorsKind::Struct(inner) => field_errors(inner),
                ValidationErrorsKind::List(entries) => Value::Object(
                    entries
                        .iter()
                        .map(|(index, inner)| (index.to_string(), field_errors(inner)))
                        .collect(),
                ),
            };
            (camel_case(field), detail)
        })
        .collect::<Map<String, Value>>();
    Value::Object(fields)
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = !out.is_empty();
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

impl From<AppError> for std::io::Error {
    fn from(err: AppError) -> Self {
        std::io::Error::new(std::io::ErrorKind::Other, err.to_string())
    }
}
