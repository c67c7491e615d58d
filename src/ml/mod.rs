// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains the burn framework code for the network.
// Apart from infra::weights (which restores burn records),
// no other layer imports from burn.
//
//   model.rs      — EfficientNet-B0 built from burn modules:
//                   • stem conv + batch norm + SiLU
//                   • 16 MBConv blocks with squeeze-excitation
//                   • 1×1 head conv, global average pool
//                   • classifier swapped for a single-logit head
//
//   inferencer.rs — The inference engine
//                   Builds the model once, restores weights
//                   (or falls back to random ones), and runs
//                   the forward pass for the prediction service
//
// Reference: Tan & Le (2019) EfficientNet: Rethinking Model Scaling
//            Burn Book §3 (Building Blocks)

/// EfficientNet-B0 architecture with a binary head
pub mod model;

/// Inference engine — loads weights and produces logits
pub mod inferencer;
