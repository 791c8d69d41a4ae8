use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use civitas_engine::EngineError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Missing or unknown actor")]
    Unauthenticated,

    #[error("Invalid request: {0}")]
    BadRequest(String),
}

impl ServerError {
    fn status(&self) -> StatusCode {
        match self {
            ServerError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Engine(err) => match err {
                EngineError::NotFound(_) => StatusCode::NOT_FOUND,
                EngineError::Forbidden(_)
                | EngineError::BlockedActor
                | EngineError::QuotaExceeded { .. } => StatusCode::FORBIDDEN,
                EngineError::InvalidTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                EngineError::Conflict(_) => StatusCode::CONFLICT,
                EngineError::PaymentFailure(_) => StatusCode::PAYMENT_REQUIRED,
                EngineError::Validation(_) | EngineError::InvalidActor(_) => {
                    StatusCode::BAD_REQUEST
                }
                EngineError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ServerError::Unauthenticated => "unauthenticated",
            ServerError::BadRequest(_) => "bad_request",
            ServerError::Engine(err) => err.code(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "Internal server error".to_string()
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "request rejected");
            self.to_string()
        };

        let body = serde_json::json!({
            "error": message,
            "code": self.code(),
        });

        (status, axum::Json(body)).into_response()
    }
}
