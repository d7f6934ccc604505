//! Mapping of core errors onto HTTP responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use idefi_core::error::{
    AgentError, ExternalError, FactoryError, IdefiError, TrackingError, ValidationError,
};

/// Handler error, rendered as `{"error": "<message>"}`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] IdefiError),

    /// Uploaded file could not be saved locally
    #[error("Failed to save upload {0}")]
    Upload(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        let core = match self {
            ApiError::Core(core) => core,
            ApiError::Upload(_) => return StatusCode::INTERNAL_SERVER_ERROR,
        };
        match core {
            IdefiError::Validation(_) => StatusCode::BAD_REQUEST,
            IdefiError::Agent(AgentError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            IdefiError::Agent(_) => StatusCode::NOT_FOUND,
            IdefiError::External(_) => StatusCode::BAD_GATEWAY,
            IdefiError::Factory(FactoryError::ImageGeneration(_)) => StatusCode::BAD_GATEWAY,
            IdefiError::Factory(_) => StatusCode::INTERNAL_SERVER_ERROR,
            IdefiError::Tracking(_) => StatusCode::INTERNAL_SERVER_ERROR,
            IdefiError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

macro_rules! from_core_error {
    ($($error:ty),*) => {
        $(
            impl From<$error> for ApiError {
                fn from(err: $error) -> Self {
                    ApiError::Core(err.into())
                }
            }
        )*
    };
}

from_core_error!(ValidationError, AgentError, ExternalError, FactoryError, TrackingError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        if status.is_server_error() {
            tracing::error!(%status, "request failed: {}", message);
        } else {
            tracing::debug!(%status, "request rejected: {}", message);
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}
