// ============================================================
// Domain Layer
// ============================================================
// Pure Rust types shared by every other layer.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//
// Reference: Rust Book §9 (Error Handling)

/// Configuration and input validation errors
pub mod error;
