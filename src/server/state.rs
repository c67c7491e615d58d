//! Shared application state

use crate::application::predict_use_case::PredictUseCase;

/// State shared by all request handlers. Built once before the
/// listener is bound; read-only afterwards.
pub struct AppState {
    pub predictor: PredictUseCase,
}

impl AppState {
    pub fn new(predictor: PredictUseCase) -> Self {
        Self { predictor }
    }
}
