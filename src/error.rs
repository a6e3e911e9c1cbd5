use std::io;
use std::path::PathBuf;
use thiserror::Error;
use actix_web::{HttpResponse, ResponseError, http::StatusCode};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Could not create directory {path}: {source}")]
    DirectoryCreate { path: PathBuf, source: io::Error },

    #[error("Could not move {from} to {to}: {source}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },

    #[error("Could not decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("No video decode backend available")]
    BackendUnavailable,

    #[error("No thumbnail for '.{0}' files")]
    UnsupportedThumbnail(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),
}

impl From<actix_web::error::BlockingError> for AppError {
    fn from(_: actix_web::error::BlockingError) -> Self {
        AppError::Io(io::Error::new(
            io::ErrorKind::Interrupted,
            "blocking task canceled",
        ))
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .json(serde_json::json!({
                "error": self.to_string(),
            }))
    }

    fn status_code(&self) -> StatusCode {
        match *self {
            AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::DirectoryCreate { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Move { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Decode { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BackendUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::UnsupportedThumbnail(_) => StatusCode::NOT_FOUND,
            AppError::InvalidPath(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AlreadyExists(_) => StatusCode::CONFLICT,
        }
    }
}
