//! Mapping of store errors onto HTTP responses

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use tracing::error;

use fencekv_common::KvError;

use crate::model::common::ErrorResponse;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Store(#[from] KvError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(err) => match err {
                KvError::NotFound(_) => StatusCode::NOT_FOUND,
                KvError::InvalidToken { .. } => StatusCode::CONFLICT,
                KvError::LockHeld { .. } => StatusCode::LOCKED,
                KvError::AcquireTimeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
                KvError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            ApiError::Store(KvError::NotFound(_)) => "key not found".to_string(),
            ApiError::Store(KvError::Transport(detail)) => {
                error!(detail = %detail, "Storage transport failure");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(ErrorResponse::new(message))
    }
}
