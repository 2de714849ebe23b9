use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::inventory::InventoryError;

/// Errors surfaced to HTTP clients, always as a plain-text body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Access denied")]
    AccessDenied,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Inventory(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::AccessDenied => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}
