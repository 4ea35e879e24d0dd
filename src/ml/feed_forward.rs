use burn::{
    nn::{Dropout, DropoutConfig, Linear, LinearConfig},
    prelude::*,
    tensor::activation::gelu,
};

#[derive(Config, Debug)]
pub struct FeedForwardConfig {
    pub d_model: usize,
    pub d_ff:    usize,
    #[config(default = 0.1)]
    pub dropout: f64,
}

impl FeedForwardConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> FeedForward<B> {
        FeedForward {
            expand:   LinearConfig::new(self.d_model, self.d_ff).init(device),
            compress: LinearConfig::new(self.d_ff, self.d_model).init(device),
            dropout:  DropoutConfig::new(self.dropout).init(),
        }
    }
}

/// Position-wise FFN: Linear(d_model → d_ff) → GELU → Linear(d_ff → d_model).
#[derive(Module, Debug)]
pub struct FeedForward<B: Backend> {
    pub expand:   Linear<B>,
    pub compress: Linear<B>,
    pub dropout:  Dropout,
}

impl<B: Backend> FeedForward<B> {
    pub fn forward<const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        let hidden = self.dropout.forward(gelu(self.expand.forward(x)));
        self.compress.forward(hidden)
    }
}
