//! Error types for the server

use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::application::predict_use_case::PredictError;

/// Detail returned for every failure after the upload was accepted.
pub const PREDICTION_FAILED: &str = "Internal Server Error during prediction";

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Unprocessable request: {0}")]
    Unprocessable(String),

    #[error("Upload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Prediction error: {0}")]
    Prediction(#[from] PredictError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            ServerError::BadRequest(msg)      => (StatusCode::BAD_REQUEST, msg.clone()),
            ServerError::Unprocessable(msg)   => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            ServerError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg.clone()),
            ServerError::Prediction(e) => {
                tracing::error!(detail = %e, "Prediction Error");
                (StatusCode::INTERNAL_SERVER_ERROR, PREDICTION_FAILED.to_string())
            }
            ServerError::Internal(msg) => {
                tracing::error!(detail = %msg, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, PREDICTION_FAILED.to_string())
            }
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

// Only the body limit keeps its own status; every other broken
// form is a validation failure.
impl From<MultipartError> for ServerError {
    fn from(e: MultipartError) -> Self {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ServerError::PayloadTooLarge(e.body_text())
        } else {
            ServerError::Unprocessable(e.body_text())
        }
    }
}

impl From<MultipartRejection> for ServerError {
    fn from(rejection: MultipartRejection) -> Self {
        ServerError::Unprocessable(rejection.body_text())
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
