// ============================================================
// Layer 4 — Image Preprocessor
// ============================================================
// Turns uploaded image bytes into the normalised tensor the
// network was trained on. Steps (applied in order):
//
//   1. Decode bytes (format sniffed from content) → RGB8
//   2. Resize so the shorter side is 256 px, aspect preserved
//   3. Center-crop 224×224
//   4. Scale channel values to [0, 1]
//   5. Normalise per channel with ImageNet mean / std (R, G, B)
//
// Sizes and crop offsets follow torchvision's Resize(256) and
// CenterCrop(224): the long side is truncated, crop offsets are
// rounded half-to-even.

use image::{imageops::FilterType, RgbImage};
use thiserror::Error;

use crate::domain::image_tensor::{ImageTensor, CHANNELS, INPUT_SIZE};

/// Shorter-side length after resizing
pub const RESIZE_SHORT_SIDE: u32 = 256;

/// ImageNet channel means (R, G, B)
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNet channel standard deviations (R, G, B)
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

#[derive(Error, Debug)]
pub enum PreprocessError {
    /// The bytes are not an image the decoder understands
    #[error("cannot decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("image has no pixels ({width}x{height})")]
    Empty { width: u32, height: u32 },

    #[error("preprocessed tensor is malformed: {0}")]
    Shape(anyhow::Error),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ImagePreprocessor;

impl ImagePreprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Run the full pipeline on encoded image bytes.
    pub fn preprocess(&self, bytes: &[u8]) -> Result<ImageTensor, PreprocessError> {
        // ── Step 1: Decode and force RGB ─────────────────────────────────────
        // Alpha and palette information is discarded here.
        let rgb = image::load_from_memory(bytes)?.to_rgb8();
        let (width, height) = rgb.dimensions();
        if width == 0 || height == 0 {
            return Err(PreprocessError::Empty { width, height });
        }

        // ── Step 2: Resize shorter side to 256 ───────────────────────────────
        let (new_w, new_h) = resized_dims(width, height);
        let resized = if (new_w, new_h) == (width, height) {
            rgb
        } else {
            // Bilinear, but separable passes run in the opposite order to
            // PIL's, so values can differ slightly from torchvision's.
            image::imageops::resize(&rgb, new_w, new_h, FilterType::Triangle)
        };

        // ── Step 3: Center crop ──────────────────────────────────────────────
        let size = INPUT_SIZE as u32;
        let (left, top) = (crop_offset(new_w, size), crop_offset(new_h, size));
        let cropped: RgbImage = image::imageops::crop_imm(&resized, left, top, size, size).to_image();

        // ── Steps 4-5: Scale and normalise into CHW ──────────────────────────
        let plane = INPUT_SIZE * INPUT_SIZE;
        let mut data = vec![0.0f32; CHANNELS * plane];
        for (x, y, pixel) in cropped.enumerate_pixels() {
            let offset = y as usize * INPUT_SIZE + x as usize;
            for c in 0..CHANNELS {
                let scaled = f32::from(pixel.0[c]) / 255.0;
                data[c * plane + offset] = (scaled - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
            }
        }

        ImageTensor::new(data).map_err(PreprocessError::Shape)
    }
}

/// Output size for a shorter-side resize to `RESIZE_SHORT_SIDE`.
pub fn resized_dims(width: u32, height: u32) -> (u32, u32) {
    let short = width.min(height);
    let long  = width.max(height);
    let new_long = (f64::from(RESIZE_SHORT_SIDE) * f64::from(long) / f64::from(short)) as u32;
    if width <= height {
        (RESIZE_SHORT_SIDE, new_long)
    } else {
        (new_long, RESIZE_SHORT_SIDE)
    }
}

/// Leading offset that centers a `crop` window inside `dim`.
pub fn crop_offset(dim: u32, crop: u32) -> u32 {
    let excess = f64::from(dim.saturating_sub(crop));
    (excess / 2.0).round_ties_even() as u32
}
