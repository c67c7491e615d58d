// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates the other layers to accomplish a
// specific goal.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No HTTP or printing here (that's Layer 1)
//   - Only workflow coordination

// The image → label workflow shared by the HTTP server and the CLI
pub mod predict_use_case;
