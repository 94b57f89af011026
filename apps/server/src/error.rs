use std::io::Error as IoError;

use actix_web::{ResponseError, http::StatusCode};
use thiserror::Error;
use uppe_service::config;
use uppe_service::database::StoreError;
use uppe_service::metrics::RegistryError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0:#}")]
    Io(#[from] IoError),
    #[error("Address parsing error: {0}")]
    AddrParse(#[from] std::net::AddrParseError),
    #[error("Configuration error: {0}")]
    Config(#[from] config::Error),
    #[error("{0}")]
    Store(#[from] StoreError),
    #[error("Metrics error: {0}")]
    Metrics(#[from] RegistryError),
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
    #[error("{0:#}")]
    Startup(#[from] anyhow::Error),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
