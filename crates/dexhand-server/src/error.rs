//! Error types for the API layer.
//!
//! [`ApiError`] unifies all failure modes into a single enum that can
//! be converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use dexhand_core::{CommandError, ModelError, MotionError};

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request payload or parameters are invalid. Nothing reached
    /// the simulation.
    #[error("invalid request: {0}")]
    Validation(String),

    /// A serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<MotionError> for ApiError {
    fn from(error: MotionError) -> Self {
        match error {
            MotionError::NotFound(name) => Self::NotFound(format!("motion {name}")),
            MotionError::Invalid { reason } => Self::Validation(reason),
            other @ (MotionError::Io { .. } | MotionError::Yaml { .. }) => {
                Self::Internal(other.to_string())
            }
        }
    }
}

impl From<CommandError> for ApiError {
    fn from(error: CommandError) -> Self {
        match error {
            CommandError::Invalid { reason } => Self::Validation(reason),
        }
    }
}

impl From<ModelError> for ApiError {
    fn from(error: ModelError) -> Self {
        Self::Internal(error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Serialization(e) => {
                (StatusCode::INTERNAL_SERVER_ERROR, format!("JSON error: {e}"))
            }
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn motion_not_found_maps_to_404() {
        let api: ApiError = MotionError::NotFound("wave".to_owned()).into();
        assert!(matches!(api, ApiError::NotFound(_)));
    }

    #[test]
    fn invalid_motion_maps_to_validation() {
        let api: ApiError = MotionError::Invalid {
            reason: "scale must be positive, got 0".to_owned(),
        }
        .into();
        assert!(matches!(api, ApiError::Validation(_)));
    }

    #[test]
    fn invalid_command_maps_to_validation() {
        let api: ApiError = CommandError::Invalid {
            reason: "max_force must be positive, got 0".to_owned(),
        }
        .into();
        assert!(matches!(api, ApiError::Validation(_)));
    }
}
