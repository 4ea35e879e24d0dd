use burn::{
    nn::{loss::CrossEntropyLossConfig, Dropout, DropoutConfig, Linear, LinearConfig},
    prelude::*,
    tensor::activation::log_softmax,
};

use crate::domain::error::{ConfigError, ModelError};
use crate::infra::summary::ModelSummary;
use crate::ml::{
    decoder::{Decoder, DecoderBlockConfig, DecoderInput},
    embedding::{TokenEmbedding, TokenEmbeddingConfig},
    encoder::{Encoder, EncoderBlockConfig},
    mask::{causal_mask, combine_opt, padding_mask, self_padding_mask},
    positional::{PositionalEncoding, PositionalEncodingConfig},
};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct TransformerConfig {
    pub vocab_size: usize,
    pub max_len:    usize,
    pub d_model:    usize,
    pub num_heads:  usize,
    #[config(default = 1)]
    pub num_encoders: usize,
    #[config(default = 1)]
    pub num_decoders: usize,
    #[config(default = 2048)]
    pub d_ff: usize,
    #[config(default = 0.1)]
    pub dropout: f64,
    /// Token id used for padding. Padded keys are masked out of attention
    /// and padded targets are ignored by the loss.
    #[config(default = "None")]
    pub pad_token: Option<usize>,
    #[config(default = 1e-5)]
    pub layer_norm_eps: f64,
}

impl TransformerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sizes = [
            ("vocab_size", self.vocab_size),
            ("max_len", self.max_len),
            ("d_model", self.d_model),
            ("num_heads", self.num_heads),
            ("d_ff", self.d_ff),
        ];
        if let Some(&(field, _)) = sizes.iter().find(|(_, v)| *v == 0) {
            return Err(ConfigError::Zero { field });
        }
        if self.d_model % self.num_heads != 0 {
            return Err(ConfigError::HeadsDoNotDivide {
                d_model:   self.d_model,
                num_heads: self.num_heads,
            });
        }
        if self.d_model % 2 != 0 {
            return Err(ConfigError::OddModelDim(self.d_model));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(ConfigError::Dropout(self.dropout));
        }
        match self.pad_token {
            Some(pad_token) if pad_token >= self.vocab_size => Err(ConfigError::PadOutOfVocab {
                pad_token,
                vocab_size: self.vocab_size,
            }),
            _ => Ok(()),
        }
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<Transformer<B>, ConfigError> {
        self.validate()?;

        let encoder = EncoderBlockConfig::new(self.d_model, self.num_heads, self.d_ff)
            .with_dropout(self.dropout)
            .with_layer_norm_eps(self.layer_norm_eps)
            .init_stack(self.num_encoders, device);
        let decoder = DecoderBlockConfig::new(self.d_model, self.num_heads, self.d_ff)
            .with_dropout(self.dropout)
            .with_layer_norm_eps(self.layer_norm_eps)
            .init_stack(self.num_decoders, device);

        let model = Transformer {
            embedding:  TokenEmbeddingConfig::new(self.vocab_size, self.d_model).init(device),
            positional: PositionalEncodingConfig::new(self.max_len, self.d_model).init(device),
            dropout:    DropoutConfig::new(self.dropout).init(),
            encoder,
            decoder,
            output:     LinearConfig::new(self.d_model, self.vocab_size).init(device),
            vocab_size: self.vocab_size,
            max_len:    self.max_len,
            pad_token:  self.pad_token,
        };

        tracing::info!(
            "Transformer ready: d_model={}, heads={}, d_ff={}, max_len={}",
            self.d_model,
            self.num_heads,
            self.d_ff,
            self.max_len,
        );
        model.summary().log();
        Ok(model)
    }
}

/// Encoder-decoder Transformer producing per-position vocabulary logits.
///
/// Source and target share one embedding table.
#[derive(Module, Debug)]
pub struct Transformer<B: Backend> {
    pub embedding:  TokenEmbedding<B>,
    pub positional: PositionalEncoding<B>,
    pub dropout:    Dropout,
    pub encoder:    Encoder<B>,
    pub decoder:    Decoder<B>,
    pub output:     Linear<B>,
    pub vocab_size: usize,
    pub max_len:    usize,
    pub pad_token:  Option<usize>,
}

/// Result of running the encoder once; reused across decoder calls.
#[derive(Debug, Clone)]
pub struct EncoderOutput<B: Backend> {
    /// [batch, src_len, d_model]
    pub memory: Tensor<B, 3>,
    /// Source ids, kept to mask padded memory positions in cross-attention.
    pub source: Tensor<B, 2, Int>,
}

impl<B: Backend> Transformer<B> {
    /// source: [batch, src_len], target: [batch, tgt_len] → logits [batch, tgt_len, vocab_size]
    ///
    /// # Panics
    /// If a sequence is longer than `max_len`; `try_forward` checks first.
    pub fn forward(&self, source: Tensor<B, 2, Int>, target: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let encoded = self.encode(source);
        self.decode(target, &encoded)
    }

    pub fn try_forward(
        &self,
        source: Tensor<B, 2, Int>,
        target: Tensor<B, 2, Int>,
    ) -> Result<Tensor<B, 3>, ModelError> {
        self.check_pair(source.dims(), target.dims())?;
        self.check_tokens("source", &source)?;
        self.check_tokens("target", &target)?;
        Ok(self.forward(source, target))
    }

    /// source: [batch, src_len] → contextual representations of every source token.
    pub fn encode(&self, source: Tensor<B, 2, Int>) -> EncoderOutput<B> {
        let [_, src_len] = source.dims();
        let mask = self
            .pad_token
            .map(|pad| padding_mask(source.clone(), pad, src_len));

        let memory = self.encoder.forward(self.embed(source.clone()), mask);
        tracing::trace!("encoded source: {:?}", memory.dims());
        EncoderOutput { memory, source }
    }

    /// target: [batch, tgt_len] → logits [batch, tgt_len, vocab_size]
    pub fn decode(&self, target: Tensor<B, 2, Int>, encoded: &EncoderOutput<B>) -> Tensor<B, 3> {
        let [batch_size, tgt_len] = target.dims();
        let device = target.device();

        let self_mask = combine_opt(
            Some(causal_mask(batch_size, tgt_len, &device)),
            self.pad_token.map(|pad| self_padding_mask(target.clone(), pad)),
        );
        let memory_mask = self
            .pad_token
            .map(|pad| padding_mask(encoded.source.clone(), pad, tgt_len));

        let hidden = self.decoder.forward(DecoderInput {
            target: self.embed(target),
            memory: encoded.memory.clone(),
            self_mask,
            memory_mask,
        });
        let logits = self.output.forward(hidden);
        tracing::trace!("decoded logits: {:?}", logits.dims());
        logits
    }

    /// Teacher-forced cross-entropy over every target position.
    ///
    /// target_in is the decoder input (shifted right, starts with BOS),
    /// target_out the tokens to predict. Both are [batch, tgt_len].
    /// Positions whose target is `pad_token` do not contribute.
    pub fn forward_loss(
        &self,
        source:     Tensor<B, 2, Int>,
        target_in:  Tensor<B, 2, Int>,
        target_out: Tensor<B, 2, Int>,
    ) -> (Tensor<B, 1>, Tensor<B, 3>) {
        let [batch_size, tgt_len] = target_out.dims();
        let logits = self.forward(source, target_in);

        let logits_flat = logits.clone().reshape([batch_size * tgt_len, self.vocab_size]);
        let targets_flat = target_out.reshape([batch_size * tgt_len]);

        let loss = match self.pad_token {
            None => CrossEntropyLossConfig::new()
                .init(&logits.device())
                .forward(logits_flat, targets_flat),
            // Mean over non-pad targets only, so extra padding in a batch
            // does not shrink the loss of the real tokens.
            Some(pad) => {
                let keep = targets_flat.clone().equal_elem(pad as i64).bool_not().float();
                let nll = log_softmax(logits_flat, 1)
                    .gather(1, targets_flat.unsqueeze_dim::<2>(1))
                    .reshape([batch_size * tgt_len])
                    .neg();
                (nll * keep.clone()).sum() / keep.sum().clamp_min(1.0)
            }
        };
        (loss, logits)
    }

    /// Parameter counts per component.
    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            vocab_size:       self.vocab_size,
            max_len:          self.max_len,
            encoder_blocks:   self.encoder.num_blocks(),
            decoder_blocks:   self.decoder.num_blocks(),
            embedding_params: self.embedding.num_params(),
            encoder_params:   self.encoder.num_params(),
            decoder_params:   self.decoder.num_params(),
            output_params:    self.output.num_params(),
            total_params:     self.num_params(),
        }
    }

    pub fn check_source(&self, dims: [usize; 2]) -> Result<(), ModelError> {
        self.check_len("source", dims[1])
    }

    pub fn check_pair(&self, source: [usize; 2], target: [usize; 2]) -> Result<(), ModelError> {
        self.check_len("source", source[1])?;
        self.check_len("target", target[1])?;
        if source[0] != target[0] {
            return Err(ModelError::BatchMismatch {
                source_batch: source[0],
                target_batch: target[0],
            });
        }
        Ok(())
    }

    /// Every id must index the embedding table.
    pub fn check_tokens(&self, which: &'static str, ids: &Tensor<B, 2, Int>) -> Result<(), ModelError> {
        let max = ids.clone().max().into_scalar().elem::<i64>();
        if max >= self.vocab_size as i64 {
            return Err(ModelError::TokenOutOfVocab {
                which,
                token: max as usize,
                vocab_size: self.vocab_size,
            });
        }
        Ok(())
    }

    fn check_len(&self, which: &'static str, len: usize) -> Result<(), ModelError> {
        if len == 0 {
            return Err(ModelError::EmptySequence { which });
        }
        if len > self.max_len {
            return Err(ModelError::SequenceTooLong { which, len, max_len: self.max_len });
        }
        Ok(())
    }

    /// Embedding + positional encoding + dropout.
    fn embed(&self, ids: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let x = self.embedding.forward(ids);
        self.dropout.forward(self.positional.forward(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{CpuAutodiffBackend, CpuBackend as TB};
    use crate::test_utils::{assert_close, init_tracing};

    const VOCAB: usize = 13;

    fn config() -> TransformerConfig {
        TransformerConfig::new(VOCAB, 6, 8, 2)
            .with_num_encoders(2)
            .with_num_decoders(2)
            .with_d_ff(16)
            .with_dropout(0.0)
    }

    fn ids(rows: &[&[i32]], device: &<TB as Backend>::Device) -> Tensor<TB, 2, Int> {
        let width = rows[0].len();
        let flat: Vec<i32> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Tensor::<TB, 1, Int>::from_ints(flat.as_slice(), device).reshape([rows.len(), width])
    }

    #[test]
    fn test_logits_shape() {
        init_tracing();
        let device = Default::default();
        let model = config().init::<TB>(&device).unwrap();

        let source = ids(&[&[1, 2, 3, 4, 5], &[5, 4, 3, 2, 1]], &device);
        let target = ids(&[&[1, 7, 8], &[1, 9, 9]], &device);
        assert_eq!(model.forward(source, target).dims(), [2, 3, VOCAB]);
    }

    #[test]
    fn test_config_defaults() {
        let cfg = TransformerConfig::new(100, 32, 64, 8);
        assert_eq!(cfg.num_encoders, 1);
        assert_eq!(cfg.num_decoders, 1);
        assert_eq!(cfg.d_ff, 2048);
        assert_eq!(cfg.pad_token, None);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_configs() {
        assert_eq!(
            TransformerConfig::new(10, 4, 10, 4).validate(),
            Err(ConfigError::HeadsDoNotDivide { d_model: 10, num_heads: 4 })
        );
        assert_eq!(
            TransformerConfig::new(10, 4, 9, 3).validate(),
            Err(ConfigError::OddModelDim(9))
        );
        assert_eq!(
            TransformerConfig::new(0, 4, 8, 2).validate(),
            Err(ConfigError::Zero { field: "vocab_size" })
        );
        assert_eq!(
            TransformerConfig::new(10, 4, 8, 0).validate(),
            Err(ConfigError::Zero { field: "num_heads" })
        );
        assert_eq!(
            TransformerConfig::new(10, 4, 8, 2).with_dropout(1.0).validate(),
            Err(ConfigError::Dropout(1.0))
        );
        assert_eq!(
            TransformerConfig::new(10, 4, 8, 2).with_pad_token(Some(10)).validate(),
            Err(ConfigError::PadOutOfVocab { pad_token: 10, vocab_size: 10 })
        );
        let device = Default::default();
        assert!(TransformerConfig::new(10, 4, 10, 4).init::<TB>(&device).is_err());
    }

    #[test]
    fn test_future_target_tokens_do_not_leak() {
        let device = Default::default();
        let model = config().init::<TB>(&device).unwrap();
        let source = ids(&[&[3, 4, 5]], &device);

        let a = model.forward(source.clone(), ids(&[&[1, 6, 7, 8]], &device));
        let b = model.forward(source, ids(&[&[1, 6, 2, 11]], &device));
        assert_close(
            a.clone().slice([0..1, 0..2, 0..VOCAB]),
            b.clone().slice([0..1, 0..2, 0..VOCAB]),
            1e-5,
        );
        let diff = (a.slice([0..1, 2..3, 0..VOCAB]) - b.slice([0..1, 2..3, 0..VOCAB]))
            .abs()
            .sum()
            .into_scalar()
            .elem::<f32>();
        assert!(diff > 1e-6, "changed token had no effect on its own position");
    }

    #[test]
    fn test_left_padded_target_stays_causal() {
        let device = Default::default();
        let model = config().with_pad_token(Some(0)).init::<TB>(&device).unwrap();
        let source = ids(&[&[3, 4, 5]], &device);

        // Only positions 2 and 3 differ; the padded prefix must not see them.
        let a = model.forward(source.clone(), ids(&[&[0, 1, 6, 7]], &device));
        let b = model.forward(source, ids(&[&[0, 1, 9, 11]], &device));
        assert_close(
            a.slice([0..1, 0..2, 0..VOCAB]),
            b.slice([0..1, 0..2, 0..VOCAB]),
            1e-5,
        );
    }

    #[test]
    fn test_source_padding_is_ignored() {
        let device = Default::default();
        let model = config().with_pad_token(Some(0)).init::<TB>(&device).unwrap();
        let target = ids(&[&[1, 9, 10]], &device);

        let padded = model.forward(ids(&[&[5, 6, 0, 0]], &device), target.clone());
        let exact = model.forward(ids(&[&[5, 6]], &device), target);
        assert_close(padded, exact, 1e-4);
    }

    #[test]
    fn test_encode_once_decode_many() {
        let device = Default::default();
        let model = config().init::<TB>(&device).unwrap();
        let source = ids(&[&[2, 3, 4]], &device);
        let target = ids(&[&[1, 5]], &device);

        let encoded = model.encode(source.clone());
        assert_eq!(encoded.memory.dims(), [1, 3, 8]);
        assert_close(
            model.decode(target.clone(), &encoded),
            model.forward(source, target),
            1e-6,
        );
    }

    #[test]
    fn test_try_forward_reports_bad_batches() {
        let device = Default::default();
        let model = config().init::<TB>(&device).unwrap();

        let too_long = ids(&[&[1, 2, 3, 4, 5, 6, 7]], &device);
        assert_eq!(
            model.try_forward(too_long, ids(&[&[1]], &device)).unwrap_err(),
            ModelError::SequenceTooLong { which: "source", len: 7, max_len: 6 }
        );

        let source = ids(&[&[1, 2], &[3, 4]], &device);
        assert_eq!(
            model.try_forward(source.clone(), ids(&[&[1, 2]], &device)).unwrap_err(),
            ModelError::BatchMismatch { source_batch: 2, target_batch: 1 }
        );

        assert_eq!(
            model.try_forward(source.clone(), ids(&[&[1], &[13]], &device)).unwrap_err(),
            ModelError::TokenOutOfVocab { which: "target", token: 13, vocab_size: VOCAB }
        );
        assert_eq!(
            model.try_forward(ids(&[&[20, 2]], &device), ids(&[&[1]], &device)).unwrap_err(),
            ModelError::TokenOutOfVocab { which: "source", token: 20, vocab_size: VOCAB }
        );

        let ok = model.try_forward(source, ids(&[&[1], &[1]], &device)).unwrap();
        assert_eq!(ok.dims(), [2, 1, VOCAB]);
    }

    #[test]
    fn test_loss_is_finite_and_differentiable() {
        type AB = CpuAutodiffBackend;
        let device = Default::default();
        let model = config().with_pad_token(Some(0)).init::<AB>(&device).unwrap();

        let source = Tensor::<AB, 2, Int>::from_ints([[4, 5, 6, 0]], &device);
        let target_in = Tensor::<AB, 2, Int>::from_ints([[1, 7, 8]], &device);
        let target_out = Tensor::<AB, 2, Int>::from_ints([[7, 8, 0]], &device);

        let (loss, logits) = model.forward_loss(source, target_in, target_out);
        assert_eq!(logits.dims(), [1, 3, VOCAB]);
        let value = loss.clone().into_scalar().elem::<f64>();
        assert!(value.is_finite() && value > 0.0, "loss = {value}");

        let grads = loss.backward();
        let grad = model.output.weight.grad(&grads).expect("output layer has a gradient");
        assert_eq!(grad.dims(), [8, VOCAB]);
    }

    #[test]
    fn test_trailing_padding_does_not_change_loss() {
        let device = Default::default();
        let model = config().with_pad_token(Some(0)).init::<TB>(&device).unwrap();
        let source = ids(&[&[4, 5, 6]], &device);

        let (exact, _) = model.forward_loss(
            source.clone(),
            ids(&[&[1, 7]], &device),
            ids(&[&[7, 8]], &device),
        );
        let (padded, _) = model.forward_loss(
            source,
            ids(&[&[1, 7, 8]], &device),
            ids(&[&[7, 8, 0]], &device),
        );
        let exact = exact.into_scalar().elem::<f32>();
        let padded = padded.into_scalar().elem::<f32>();
        assert!((exact - padded).abs() < 1e-5, "{exact} vs {padded}");
    }

    #[test]
    fn test_loss_without_pad_token_matches_mean_cross_entropy() {
        let device = Default::default();
        let model = config().init::<TB>(&device).unwrap();
        let source = ids(&[&[4, 5, 6]], &device);
        let target_out = ids(&[&[7, 8]], &device);

        let (loss, logits) = model.forward_loss(source, ids(&[&[1, 7]], &device), target_out);
        let probs = burn::tensor::activation::softmax(logits, 2)
            .into_data()
            .to_vec::<f32>()
            .unwrap();
        let expected = -(probs[7].ln() + probs[VOCAB + 8].ln()) / 2.0;
        let loss = loss.into_scalar().elem::<f32>();
        assert!((loss - expected).abs() < 1e-4, "{loss} vs {expected}");
    }

    #[test]
    fn test_summary_counts_components() {
        let device = Default::default();
        let model = TransformerConfig::new(VOCAB, 6, 8, 2)
            .with_d_ff(16)
            .init::<TB>(&device)
            .unwrap();
        let s = model.summary();

        let attention = 4 * (8 * 8 + 8);
        let ffn = (8 * 16 + 16) + (16 * 8 + 8);
        let norm = 2 * 8;
        assert_eq!(s.embedding_params, VOCAB * 8);
        assert_eq!(s.output_params, 8 * VOCAB + VOCAB);
        assert_eq!(s.encoder_params, attention + ffn + 2 * norm);
        assert_eq!(s.decoder_params, 2 * attention + ffn + 3 * norm);
        assert_eq!(s.total_params, s.component_params());
    }
}
