// ============================================================
// Layer 3 — ImageTensor Domain Type
// ============================================================
// A preprocessed image ready for the network: 3 channels
// (R, G, B) of 224×224 normalised f32 values, stored
// channel-major (CHW) exactly as the model consumes it.
//
// Kept free of burn types so the domain stays framework-agnostic;
// the ml layer turns it into a tensor on its own device.

use anyhow::{ensure, Result};

/// Input channels expected by the network
pub const CHANNELS: usize = 3;

/// Spatial size after center-cropping
pub const INPUT_SIZE: usize = 224;

#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    data: Vec<f32>,
}

impl ImageTensor {
    /// Number of values in one CHW image
    pub const LEN: usize = CHANNELS * INPUT_SIZE * INPUT_SIZE;

    /// Wrap a CHW buffer. Fails unless it holds exactly `LEN` values.
    pub fn new(data: Vec<f32>) -> Result<Self> {
        ensure!(
            data.len() == Self::LEN,
            "expected {} values for a {CHANNELS}x{INPUT_SIZE}x{INPUT_SIZE} image, got {}",
            Self::LEN,
            data.len()
        );
        Ok(Self { data })
    }

    /// Shape with the leading batch dimension of size 1
    pub const fn batch_shape() -> [usize; 4] {
        [1, CHANNELS, INPUT_SIZE, INPUT_SIZE]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Value at channel `c`, row `y`, column `x`
    #[cfg(test)]
    pub fn get(&self, c: usize, y: usize, x: usize) -> f32 {
        self.data[(c * INPUT_SIZE + y) * INPUT_SIZE + x]
    }
}
