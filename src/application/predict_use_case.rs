// ============================================================
// Layer 2 — Predict Use Case
// ============================================================
// Orchestrates one classification:
//
//   Step 1: Decode + normalise the image   (Layer 4 - data)
//   Step 2: Forward pass → logit           (Layer 5 - ml, via LogitModel)
//   Step 3: Sigmoid + threshold → label    (Layer 3 - domain)
//
// The model handle is injected, immutable after startup and
// shared by every request.

use anyhow::Context;
use std::{path::Path, sync::Arc};
use thiserror::Error;

use crate::data::preprocessor::{ImagePreprocessor, PreprocessError};
use crate::domain::{
    prediction::Prediction,
    traits::{LogitModel, WeightsStatus},
};

/// Why a prediction could not be produced.
#[derive(Error, Debug)]
pub enum PredictError {
    /// The upload could not be decoded as an image
    #[error("invalid image: {0}")]
    InvalidImage(#[source] PreprocessError),

    /// Preprocessing or the forward pass failed for an internal reason
    #[error("inference failed: {0:#}")]
    Inference(anyhow::Error),
}

impl From<PreprocessError> for PredictError {
    fn from(e: PreprocessError) -> Self {
        match e {
            PreprocessError::Decode(_) | PreprocessError::Empty { .. } => PredictError::InvalidImage(e),
            PreprocessError::Shape(inner) => PredictError::Inference(inner),
        }
    }
}

#[derive(Clone)]
pub struct PredictUseCase {
    model:        Arc<dyn LogitModel>,
    preprocessor: ImagePreprocessor,
}

impl PredictUseCase {
    pub fn new(model: Arc<dyn LogitModel>) -> Self {
        Self { model, preprocessor: ImagePreprocessor::new() }
    }

    /// Classify encoded image bytes. Blocking; CPU-bound.
    pub fn predict(&self, image_bytes: &[u8]) -> Result<Prediction, PredictError> {
        let tensor = self.preprocessor.preprocess(image_bytes)?;
        let logit  = self.model.logit(&tensor).map_err(PredictError::Inference)?;
        let prediction = Prediction::from_logit(logit);

        tracing::debug!(
            label = %prediction.label,
            raw_probability = prediction.raw_probability,
            "Prediction complete"
        );
        Ok(prediction)
    }

    /// Classify an image file on disk.
    pub fn predict_file(&self, path: &Path) -> anyhow::Result<Prediction> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Cannot read image '{}'", path.display()))?;
        self.predict(&bytes)
            .with_context(|| format!("Cannot classify '{}'", path.display()))
    }

    pub fn weights_status(&self) -> &WeightsStatus {
        self.model.weights_status()
    }
}


#[cfg(test)]
mod tests {
    use super::stub::StubModel;
    use super::*;
    use crate::domain::prediction::Label;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let img = RgbImage::from_pixel(300, 260, Rgb([180, 120, 90]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn zero_logit_is_classified_melanocytic() {
        let use_case = PredictUseCase::new(Arc::new(StubModel::returning(0.0)));
        let prediction = use_case.predict(&png_bytes()).unwrap();
        assert_eq!(prediction.label, Label::Melanocytic);
        assert_eq!(prediction.raw_probability, 0.5);
    }

    #[test]
    fn negative_logit_is_classified_other() {
        let use_case = PredictUseCase::new(Arc::new(StubModel::returning(-2.0)));
        let prediction = use_case.predict(&png_bytes()).unwrap();
        assert_eq!(prediction.label, Label::Other);
        assert!((prediction.confidence - (1.0 - prediction.raw_probability)).abs() < 1e-12);
    }

    #[test]
    fn undecodable_bytes_never_reach_the_model() {
        let model = Arc::new(StubModel::returning(1.0));
        let use_case = PredictUseCase::new(model.clone());
        let err = use_case.predict(b"GIF89a but not really").unwrap_err();
        assert!(matches!(err, PredictError::InvalidImage(_)));
        assert_eq!(model.calls(), 0);
    }

    #[test]
    fn model_failures_are_inference_errors() {
        let use_case = PredictUseCase::new(Arc::new(StubModel::failing()));
        let err = use_case.predict(&png_bytes()).unwrap_err();
        assert!(matches!(err, PredictError::Inference(_)));
    }

    #[test]
    fn predict_file_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lesion.png");
        std::fs::write(&path, png_bytes()).unwrap();

        let use_case = PredictUseCase::new(Arc::new(StubModel::returning(3.0)));
        assert_eq!(use_case.predict_file(&path).unwrap().label, Label::Melanocytic);
        assert!(use_case.predict_file(&dir.path().join("missing.png")).is_err());
    }
}
