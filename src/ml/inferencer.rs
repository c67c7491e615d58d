// ============================================================
// Layer 5 — Inferencer
// ============================================================
use anyhow::{anyhow, bail, Result};
use burn::prelude::*;
use std::{path::PathBuf, sync::Mutex};

use crate::domain::{
    image_tensor::ImageTensor,
    traits::{LogitModel, WeightsStatus},
};
use crate::infra::weights::WeightStore;
use crate::ml::model::{build_model, EfficientNet};

// The inner (non-autodiff) backend never tracks gradients, and
// BatchNorm / Dropout take their inference paths on it.
#[cfg(not(feature = "wgpu"))]
pub type InferBackend = burn::backend::NdArray;
#[cfg(feature = "wgpu")]
pub type InferBackend = burn::backend::Wgpu;

pub type InferDevice = <InferBackend as Backend>::Device;

/// How the model's weights are obtained at startup.
#[derive(Debug, Clone)]
pub struct InferencerOptions {
    pub weights_path:   PathBuf,
    /// Refuse to start instead of falling back to random weights
    pub strict_weights: bool,
}

pub struct Inferencer {
    // burn modules are Send but not guaranteed Sync. The model is
    // never mutated after load; the lock only satisfies Sync.
    model:  Mutex<EfficientNet<InferBackend>>,
    device: InferDevice,
    status: WeightsStatus,
}

impl Inferencer {
    /// Build EfficientNet-B0 and try to restore its weights.
    ///
    /// Unless `strict_weights` is set, a missing or unreadable
    /// weight file is logged and the model keeps its random
    /// initialisation, so the service still comes up.
    pub fn load(options: &InferencerOptions) -> Result<Self> {
        let device = InferDevice::default();
        let model  = build_model::<InferBackend>(&device);
        tracing::debug!(
            features = model.feature_width(),
            outputs = model.num_outputs(),
            "Built EfficientNet-B0"
        );
        let store  = WeightStore::new(&options.weights_path);
        let path   = store.path().display().to_string();

        if !store.exists() {
            if options.strict_weights {
                bail!("Weight file '{path}' not found and strict weights are enabled");
            }
            tracing::warn!("{path} not found. Running with RANDOM weights.");
            let status = WeightsStatus::Random { reason: format!("{path} not found") };
            return Ok(Self::from_model(model, device, status));
        }

        match store.load(model.clone(), &device) {
            Ok(loaded) => {
                tracing::info!("Loaded EfficientNet-B0 weights from {path}");
                let status = WeightsStatus::Loaded { path: options.weights_path.clone() };
                Ok(Self::from_model(loaded, device, status))
            }
            Err(e) if options.strict_weights => {
                Err(e.context("Strict weights are enabled; refusing to start"))
            }
            Err(e) => {
                tracing::error!("Error loading weights: {e:#}");
                tracing::warn!("Server running with RANDOM weights; predictions are meaningless.");
                let status = WeightsStatus::Random { reason: format!("{e:#}") };
                Ok(Self::from_model(model, device, status))
            }
        }
    }

    pub fn from_model(
        model:  EfficientNet<InferBackend>,
        device: InferDevice,
        status: WeightsStatus,
    ) -> Self {
        Self { model: Mutex::new(model), device, status }
    }
}

impl LogitModel for Inferencer {
    fn logit(&self, image: &ImageTensor) -> Result<f32> {
        // [3, 224, 224] → [1, 3, 224, 224] on the model's device
        let data  = TensorData::new(image.as_slice().to_vec(), ImageTensor::batch_shape());
        let input = Tensor::<InferBackend, 4>::from_data(data, &self.device);

        let logits = {
            let model = self.model.lock().map_err(|_| anyhow!("model lock poisoned"))?;
            model.forward(input)
        };

        let values = logits
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow!("Cannot read logits: {e:?}"))?;

        match values.as_slice() {
            [logit] => {
                tracing::debug!("logit={logit:.6}");
                Ok(*logit)
            }
            other => bail!("Expected a single logit, got {}", other.len()),
        }
    }

    fn weights_status(&self) -> &WeightsStatus {
        &self.status
    }
}
