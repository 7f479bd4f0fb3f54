use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use tos_core::CoreError;
use tos_types::KeyError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid id: {0}")]
    InvalidKey(#[from] KeyError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("store error: {0}")]
    Store(#[from] tos_store::StoreError),

    #[error("icon fetch failed: {0}")]
    IconFetch(#[from] reqwest::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidKey(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Core(CoreError::Cancelled) => StatusCode::SERVICE_UNAVAILABLE,
            Self::IconFetch(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(%status, error = %self, "request failed");
        }
        (status, self.to_string()).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
