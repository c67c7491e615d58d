// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between the uploaded bytes and the model input:
//
//   encoded image bytes (JPEG / PNG / ...)
//       │
//       ▼
//   ImagePreprocessor → decode, resize, crop, normalise
//       │
//       ▼
//   ImageTensor       → 3×224×224, handed to the ml layer
//
// No burn types here; the ml layer owns the conversion into a
// device tensor.

/// Decodes and normalises images for the classifier
pub mod preprocessor;
