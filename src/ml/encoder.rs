// ============================================================
// Encoder
// ============================================================
// One block (post-norm, as in the original paper):
//
//   x ─┬─► self-attention ─► dropout ─► (+) ─► LayerNorm ─┬─► FFN ─► dropout ─► (+) ─► LayerNorm
//      └──────────────── residual ───────┘                 └────────── residual ──┘
//
// LayerNorm normalises over d_model only, so the same weights
// serve every sequence length up to max_len.

use burn::{
    nn::{Dropout, DropoutConfig, LayerNorm, LayerNormConfig},
    prelude::*,
};

use crate::ml::attention::{AttentionInput, MultiHeadAttention, MultiHeadAttentionConfig};
use crate::ml::feed_forward::{FeedForward, FeedForwardConfig};

#[derive(Config, Debug)]
pub struct EncoderBlockConfig {
    pub d_model:   usize,
    pub num_heads: usize,
    pub d_ff:      usize,
    #[config(default = 0.1)]
    pub dropout:   f64,
    #[config(default = 1e-5)]
    pub layer_norm_eps: f64,
}

impl EncoderBlockConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        let norm = || {
            LayerNormConfig::new(self.d_model)
                .with_epsilon(self.layer_norm_eps)
                .init(device)
        };
        EncoderBlock {
            self_attn: MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
                .with_dropout(self.dropout)
                .init(device),
            attn_norm: norm(),
            ffn: FeedForwardConfig::new(self.d_model, self.d_ff)
                .with_dropout(self.dropout)
                .init(device),
            ffn_norm: norm(),
            dropout:  DropoutConfig::new(self.dropout).init(),
        }
    }

    /// `num_blocks` independently initialised blocks.
    pub fn init_stack<B: Backend>(&self, num_blocks: usize, device: &B::Device) -> Encoder<B> {
        Encoder {
            blocks: (0..num_blocks).map(|_| self.init(device)).collect(),
        }
    }
}

#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub self_attn: MultiHeadAttention<B>,
    pub attn_norm: LayerNorm<B>,
    pub ffn:       FeedForward<B>,
    pub ffn_norm:  LayerNorm<B>,
    pub dropout:   Dropout,
}

impl<B: Backend> EncoderBlock<B> {
    /// x: [batch, src_len, d_model], mask: [batch, src_len, src_len]
    pub fn forward(&self, x: Tensor<B, 3>, mask: Option<Tensor<B, 3, Bool>>) -> Tensor<B, 3> {
        let attn = self
            .self_attn
            .forward(AttentionInput::self_attn(x.clone()).mask(mask))
            .context;
        let x = self.attn_norm.forward(x + self.dropout.forward(attn));

        let ffn_out = self.ffn.forward(x.clone());
        self.ffn_norm.forward(x + self.dropout.forward(ffn_out))
    }
}

/// N stacked encoder blocks.
#[derive(Module, Debug)]
pub struct Encoder<B: Backend> {
    pub blocks: Vec<EncoderBlock<B>>,
}

impl<B: Backend> Encoder<B> {
    pub fn forward(&self, x: Tensor<B, 3>, mask: Option<Tensor<B, 3, Bool>>) -> Tensor<B, 3> {
        self.blocks
            .iter()
            .fold(x, |hidden, block| block.forward(hidden, mask.clone()))
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }
}
