// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Handles persistence concerns that don't belong in any
// business layer:
//
//   weights.rs — Loading and saving model parameters.
//                Reads torchvision state dicts through
//                burn-import and burn's own MessagePack
//                records, validating every tensor shape
//                against the freshly built model.
//
// Reference: Burn Book §5 (Records)
//            Rust Book §9 (Error Handling with anyhow)

/// Model weight loading and saving
pub mod weights;
