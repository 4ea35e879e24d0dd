// ============================================================
// Multi-Head Attention
// ============================================================
// One module serves all three attention sites of the model:
//
//   encoder self-attention   — query = key = value = x
//   decoder masked self-attn — same, plus a causal mask
//   decoder cross-attention  — query from decoder,
//                              key = value = encoder memory
//
// Computation (per head h, d_k = d_model / num_heads):
//
//   Q_h = x_q W_q,  K_h = x_k W_k,  V_h = x_v W_v
//   A_h = softmax(Q_h K_hᵀ / √d_k + mask)
//   context = concat_h(A_h V_h) W_o
//
// Reference: Vaswani et al. (2017) §3.2

use burn::{
    nn::{Dropout, DropoutConfig, Linear, LinearConfig},
    prelude::*,
    tensor::activation::softmax,
};

#[derive(Config, Debug)]
pub struct MultiHeadAttentionConfig {
    pub d_model:   usize,
    pub num_heads: usize,
    #[config(default = 0.1)]
    pub dropout:   f64,
    /// Score assigned to masked positions before softmax.
    /// Finite so that a fully-masked row degrades to uniform weights instead of NaN.
    #[config(default = -1.0e4)]
    pub mask_value: f64,
}

impl MultiHeadAttentionConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> MultiHeadAttention<B> {
        let linear = || LinearConfig::new(self.d_model, self.d_model).init(device);
        MultiHeadAttention {
            w_query:    linear(),
            w_key:      linear(),
            w_value:    linear(),
            w_output:   linear(),
            dropout:    DropoutConfig::new(self.dropout).init(),
            num_heads:  self.num_heads,
            d_k:        self.d_model / self.num_heads,
            mask_value: self.mask_value,
        }
    }
}

#[derive(Module, Debug)]
pub struct MultiHeadAttention<B: Backend> {
    pub w_query:    Linear<B>,
    pub w_key:      Linear<B>,
    pub w_value:    Linear<B>,
    pub w_output:   Linear<B>,
    pub dropout:    Dropout,
    pub num_heads:  usize,
    pub d_k:        usize,
    pub mask_value: f64,
}

/// Inputs of one attention call. Shapes:
///   query: [batch, q_len, d_model]
///   key, value: [batch, k_len, d_model]
///   mask: [batch, q_len, k_len], true = blocked
#[derive(Debug, Clone)]
pub struct AttentionInput<B: Backend> {
    pub query: Tensor<B, 3>,
    pub key:   Tensor<B, 3>,
    pub value: Tensor<B, 3>,
    pub mask:  Option<Tensor<B, 3, Bool>>,
}

impl<B: Backend> AttentionInput<B> {
    pub fn self_attn(x: Tensor<B, 3>) -> Self {
        Self { query: x.clone(), key: x.clone(), value: x, mask: None }
    }

    pub fn cross_attn(query: Tensor<B, 3>, memory: Tensor<B, 3>) -> Self {
        Self { query, key: memory.clone(), value: memory, mask: None }
    }

    pub fn mask(mut self, mask: Option<Tensor<B, 3, Bool>>) -> Self {
        self.mask = mask;
        self
    }
}

#[derive(Debug, Clone)]
pub struct AttentionOutput<B: Backend> {
    /// [batch, q_len, d_model]
    pub context: Tensor<B, 3>,
    /// [batch, num_heads, q_len, k_len], each row sums to 1
    pub weights: Tensor<B, 4>,
}

impl<B: Backend> MultiHeadAttention<B> {
    pub fn forward(&self, input: AttentionInput<B>) -> AttentionOutput<B> {
        let [batch_size, q_len, d_model] = input.query.dims();
        let [_, k_len, _] = input.key.dims();

        let query = self.split_heads(self.w_query.forward(input.query));
        let key   = self.split_heads(self.w_key.forward(input.key));
        let value = self.split_heads(self.w_value.forward(input.value));

        // [batch, heads, q_len, k_len]
        let scores = query
            .matmul(key.swap_dims(2, 3))
            .div_scalar((self.d_k as f64).sqrt());

        let scores = match input.mask {
            Some(mask) => {
                let mask = mask
                    .unsqueeze_dim::<4>(1)
                    .expand([batch_size, self.num_heads, q_len, k_len]);
                scores.mask_fill(mask, self.mask_value)
            }
            None => scores,
        };

        let weights = softmax(scores, 3);
        let context = self
            .dropout
            .forward(weights.clone())
            .matmul(value)
            .swap_dims(1, 2)
            .reshape([batch_size, q_len, d_model]);

        AttentionOutput { context: self.w_output.forward(context), weights }
    }

    /// [batch, seq, d_model] → [batch, heads, seq, d_k]
    fn split_heads(&self, x: Tensor<B, 3>) -> Tensor<B, 4> {
        let [batch_size, seq_len, _] = x.dims();
        x.reshape([batch_size, seq_len, self.num_heads, self.d_k])
            .swap_dims(1, 2)
    }
}
