use burn::prelude::*;

#[derive(Config, Debug)]
pub struct PositionalEncodingConfig {
    pub max_len: usize,
    pub d_model: usize,
    /// Base of the geometric wavelength progression.
    #[config(default = 10000.0)]
    pub max_timescale: f64,
}

impl PositionalEncodingConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> PositionalEncoding<B> {
        let table = sinusoid_table(self.max_len, self.d_model, self.max_timescale);
        let sinusoids = Tensor::<B, 1>::from_floats(table.as_slice(), device)
            .reshape([1, self.max_len, self.d_model]);
        PositionalEncoding { sinusoids, max_len: self.max_len }
    }
}

/// Fixed sinusoidal position signal added to token embeddings.
///
/// Self-attention is permutation-invariant, so order has to be injected
/// explicitly. The table is a constant: it is stored in the record but is
/// not a trainable parameter.
#[derive(Module, Debug)]
pub struct PositionalEncoding<B: Backend> {
    /// [1, max_len, d_model]
    pub sinusoids: Tensor<B, 3>,
    pub max_len:   usize,
}

impl<B: Backend> PositionalEncoding<B> {
    /// x: [batch, seq_len, d_model] → x + PE[:seq_len]
    ///
    /// # Panics
    /// If `seq_len > max_len`. Use `Transformer::try_forward` to get an error instead.
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let [_, seq_len, d_model] = x.dims();
        assert!(
            seq_len <= self.max_len,
            "sequence length {seq_len} exceeds positional table size {}",
            self.max_len
        );
        x + self.sinusoids.clone().slice([0..1, 0..seq_len, 0..d_model])
    }
}

/// Row-major [max_len, d_model] table.
///   PE(pos, 2i)   = sin(pos / timescale^(2i/d))
///   PE(pos, 2i+1) = cos(pos / timescale^(2i/d))
pub fn sinusoid_table(max_len: usize, d_model: usize, max_timescale: f64) -> Vec<f32> {
    let mut table = vec![0.0f32; max_len * d_model];
    for pos in 0..max_len {
        for i in (0..d_model).step_by(2) {
            let angle = pos as f64 / max_timescale.powf(i as f64 / d_model as f64);
            table[pos * d_model + i] = angle.sin() as f32;
            if i + 1 < d_model {
                table[pos * d_model + i + 1] = angle.cos() as f32;
            }
        }
    }
    table
}
