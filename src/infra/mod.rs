// ============================================================
// Infrastructure Layer
// ============================================================
// Cross-cutting concerns around the model that are not part of
// the forward computation:
//
//   config_store.rs — TransformerConfig persisted as JSON so
//                     the same architecture can be rebuilt
//
//   summary.rs      — per-component parameter counts, logged
//                     through tracing or dumped as JSON
//
// Weight checkpointing is intentionally absent: this crate
// defines the model graph only.
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)

/// Model config saving and loading
pub mod config_store;

/// Parameter count summary
pub mod summary;
