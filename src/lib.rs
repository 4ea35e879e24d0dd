#![recursion_limit = "256"]
// ============================================================
// seq2seq-transformer
// ============================================================
// A Transformer encoder-decoder for sequence-to-sequence tasks
// (e.g. machine translation), written against the Burn framework.
//
// Layers of this crate:
//
//   domain/   — plain Rust error types, no Burn types
//   ml/       — the model itself (all Burn code lives here)
//   infra/    — config persistence and model summaries
//   backend   — backend aliases (CPU, GPU, autodiff)
//
// The crate only defines the forward computation graph.
// Gradients come from Burn's Autodiff backend decorator,
// kernels from NdArray / Wgpu.
//
// Reference: Vaswani et al. (2017) Attention Is All You Need
//            Burn Book §3 (Building Blocks)

pub mod backend;
pub mod domain;
pub mod infra;
pub mod ml;

pub use domain::error::{ConfigError, ModelError};
pub use infra::{config_store::ConfigStore, summary::ModelSummary};
pub use ml::inferencer::GreedyDecoder;
pub use ml::model::{EncoderOutput, Transformer, TransformerConfig};
