// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs and traits that define the core concepts
// of the classifier.
//
// Rules for this layer:
//   - NO burn framework types allowed here
//   - NO file I/O or network calls
//   - Only plain Rust structs, enums, and traits

/// Labels, the decision threshold and the logit → label mapping
pub mod prediction;

/// The normalised 3×224×224 network input
pub mod image_tensor;

/// Core abstractions (traits) that other layers implement
pub mod traits;
