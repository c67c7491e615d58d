//! Request handlers

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use crate::domain::prediction::Prediction;

use super::error::{Result, ServerError};
use super::state::AppState;

pub const STATUS_MESSAGE: &str = "Skin Cancer Classification API (EfficientNet-B0) is running";

/// Multipart field carrying the image
pub const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    #[serde(rename = "class")]
    pub label: String,
    /// Percentage with two decimals, e.g. `"91.37%"`
    pub confidence: String,
    pub raw_probability: f64,
}

impl From<Prediction> for PredictResponse {
    fn from(p: Prediction) -> Self {
        Self {
            label:           p.label.to_string(),
            confidence:      p.formatted_confidence(),
            raw_probability: p.raw_probability,
        }
    }
}

/// Liveness check
pub async fn root() -> Json<Value> {
    Json(json!({ "message": STATUS_MESSAGE }))
}

/// Classify an uploaded image
pub async fn predict(
    State(state): State<Arc<AppState>>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictResponse>> {
    let image = read_image_field(multipart?).await?;
    info!(bytes = image.len(), "Received image for prediction");

    let predictor = state.predictor.clone();
    let prediction = tokio::task::spawn_blocking(move || predictor.predict(&image))
        .await
        .map_err(|e| ServerError::Internal(format!("inference task failed: {e}")))??;

    Ok(Json(prediction.into()))
}

/// Pull the `file` part out of the form, rejecting anything that is
/// not declared as `image/*` before its body is read.
async fn read_image_field(mut multipart: Multipart) -> Result<Bytes> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let is_image = field
            .content_type()
            .is_some_and(|ct| ct.starts_with("image/"));
        if !is_image {
            return Err(ServerError::BadRequest("File must be an image".to_string()));
        }
        return Ok(field.bytes().await?);
    }
    Err(ServerError::Unprocessable(format!("Field required: {FILE_FIELD}")))
}
