// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The prediction workflow talks to the network only through
// LogitModel. The burn-backed Inferencer implements it in
// production; tests plug in a stub that returns a fixed logit.

use anyhow::Result;
use std::path::PathBuf;

use crate::domain::image_tensor::ImageTensor;

// ─── LogitModel ───────────────────────────────────────────────────────────────
/// Anything that maps a preprocessed image to the raw binary logit.
///
/// Implementations:
///   - Inferencer → EfficientNet-B0 on a burn backend
///   - test stubs → constant logits
pub trait LogitModel: Send + Sync {
    /// Run one forward pass and return the single output logit.
    fn logit(&self, image: &ImageTensor) -> Result<f32>;

    /// Which weights the model is running with.
    fn weights_status(&self) -> &WeightsStatus;
}

// ─── WeightsStatus ────────────────────────────────────────────────────────────
/// Result of the one-time startup transition
/// `uninitialized → weights-loaded | random-weights`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeightsStatus {
    /// Parameters were restored from the given file
    Loaded { path: PathBuf },
    /// Parameters are the random initialisation
    Random { reason: String },
}
