use burn::{
    nn::{Embedding, EmbeddingConfig},
    prelude::*,
};

#[derive(Config, Debug)]
pub struct TokenEmbeddingConfig {
    pub vocab_size: usize,
    pub d_model:    usize,
}

impl TokenEmbeddingConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TokenEmbedding<B> {
        TokenEmbedding {
            table: EmbeddingConfig::new(self.vocab_size, self.d_model).init(device),
            scale: (self.d_model as f64).sqrt(),
        }
    }
}

/// Token id → `d_model` vector lookup.
///
/// Vectors are multiplied by `sqrt(d_model)` so that their magnitude
/// is comparable to the positional sinusoids added afterwards.
#[derive(Module, Debug)]
pub struct TokenEmbedding<B: Backend> {
    pub table: Embedding<B>,
    pub scale: f64,
}

impl<B: Backend> TokenEmbedding<B> {
    /// ids: [batch, seq_len] → [batch, seq_len, d_model]
    pub fn forward(&self, ids: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        self.table.forward(ids).mul_scalar(self.scale)
    }
}
