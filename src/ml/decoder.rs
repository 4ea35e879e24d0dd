// ============================================================
// Decoder
// ============================================================
// One block has three residual sub-layers, each followed by
// LayerNorm:
//
//   1. masked self-attention over the target prefix
//      (causal mask ∨ target padding mask)
//   2. cross-attention: queries from the decoder,
//      keys/values from the encoder memory (source padding mask)
//   3. position-wise feed-forward
//
// The projection to vocabulary logits sits on top of the stack
// in ml::model, not here.

use burn::{
    nn::{Dropout, DropoutConfig, LayerNorm, LayerNormConfig},
    prelude::*,
};

use crate::ml::attention::{AttentionInput, MultiHeadAttention, MultiHeadAttentionConfig};
use crate::ml::feed_forward::{FeedForward, FeedForwardConfig};

#[derive(Config, Debug)]
pub struct DecoderBlockConfig {
    pub d_model:   usize,
    pub num_heads: usize,
    pub d_ff:      usize,
    #[config(default = 0.1)]
    pub dropout:   f64,
    #[config(default = 1e-5)]
    pub layer_norm_eps: f64,
}

impl DecoderBlockConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> DecoderBlock<B> {
        let attn = || {
            MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
                .with_dropout(self.dropout)
                .init(device)
        };
        let norm = || {
            LayerNormConfig::new(self.d_model)
                .with_epsilon(self.layer_norm_eps)
                .init(device)
        };
        DecoderBlock {
            self_attn:  attn(),
            self_norm:  norm(),
            cross_attn: attn(),
            cross_norm: norm(),
            ffn: FeedForwardConfig::new(self.d_model, self.d_ff)
                .with_dropout(self.dropout)
                .init(device),
            ffn_norm: norm(),
            dropout:  DropoutConfig::new(self.dropout).init(),
        }
    }

    pub fn init_stack<B: Backend>(&self, num_blocks: usize, device: &B::Device) -> Decoder<B> {
        Decoder {
            blocks: (0..num_blocks).map(|_| self.init(device)).collect(),
        }
    }
}

#[derive(Module, Debug)]
pub struct DecoderBlock<B: Backend> {
    pub self_attn:  MultiHeadAttention<B>,
    pub self_norm:  LayerNorm<B>,
    pub cross_attn: MultiHeadAttention<B>,
    pub cross_norm: LayerNorm<B>,
    pub ffn:        FeedForward<B>,
    pub ffn_norm:   LayerNorm<B>,
    pub dropout:    Dropout,
}

/// Inputs shared by every block of a decoder pass.
#[derive(Debug, Clone)]
pub struct DecoderInput<B: Backend> {
    /// [batch, tgt_len, d_model]
    pub target: Tensor<B, 3>,
    /// Encoder output, [batch, src_len, d_model]
    pub memory: Tensor<B, 3>,
    /// [batch, tgt_len, tgt_len]
    pub self_mask: Option<Tensor<B, 3, Bool>>,
    /// [batch, tgt_len, src_len]
    pub memory_mask: Option<Tensor<B, 3, Bool>>,
}

impl<B: Backend> DecoderBlock<B> {
    pub fn forward(&self, input: &DecoderInput<B>, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let attn = self
            .self_attn
            .forward(AttentionInput::self_attn(x.clone()).mask(input.self_mask.clone()))
            .context;
        let x = self.self_norm.forward(x + self.dropout.forward(attn));

        let cross = self
            .cross_attn
            .forward(
                AttentionInput::cross_attn(x.clone(), input.memory.clone())
                    .mask(input.memory_mask.clone()),
            )
            .context;
        let x = self.cross_norm.forward(x + self.dropout.forward(cross));

        let ffn_out = self.ffn.forward(x.clone());
        self.ffn_norm.forward(x + self.dropout.forward(ffn_out))
    }
}

/// N stacked decoder blocks.
#[derive(Module, Debug)]
pub struct Decoder<B: Backend> {
    pub blocks: Vec<DecoderBlock<B>>,
}

impl<B: Backend> Decoder<B> {
    /// → [batch, tgt_len, d_model]
    pub fn forward(&self, input: DecoderInput<B>) -> Tensor<B, 3> {
        self.blocks
            .iter()
            .fold(input.target.clone(), |hidden, block| block.forward(&input, hidden))
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }
}
