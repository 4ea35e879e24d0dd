// ============================================================
// ML / Model Layer (Burn)
// ============================================================
// This layer contains ALL Burn framework specific code.
// The domain layer never imports burn.
//
// What's in this layer:
//
//   embedding.rs    — token id → d_model vector, shared by
//                     source and target
//   positional.rs   — fixed sinusoidal position signal
//   attention.rs    — multi-head scaled dot-product attention
//                     (self-attention and cross-attention)
//   mask.rs         — causal and padding masks
//   feed_forward.rs — position-wise two-layer network (GELU)
//   encoder.rs      — encoder block + N-block stack
//   decoder.rs      — decoder block (masked self-attn,
//                     cross-attn, FFN) + N-block stack
//   model.rs        — full encoder-decoder with the output
//                     projection to vocabulary logits
//   inferencer.rs   — greedy autoregressive decoding
//
// Reference: Burn Book §3 (Building Blocks)
//            Vaswani et al. (2017) Attention Is All You Need

pub mod attention;
pub mod decoder;
pub mod embedding;
pub mod encoder;
pub mod feed_forward;
pub mod inferencer;
pub mod mask;
pub mod model;
pub mod positional;
