// ============================================================
// Domain errors
// ============================================================
// Typed errors for everything the model can reject up front:
// bad hyperparameters when building, bad token batches when
// running. Tensor algebra itself panics on shape bugs, the same
// way Burn's own modules do, so these checks run before any
// tensor is touched.

use thiserror::Error;

/// Invalid hyperparameters for a model or one of its blocks.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("d_model ({d_model}) must be divisible by num_heads ({num_heads})")]
    HeadsDoNotDivide { d_model: usize, num_heads: usize },

    #[error("d_model ({0}) must be even for sinusoidal positional encoding")]
    OddModelDim(usize),

    #[error("dropout must be in [0, 1), got {0}")]
    Dropout(f64),

    #[error("pad_token {pad_token} is outside the vocabulary (size {vocab_size})")]
    PadOutOfVocab { pad_token: usize, vocab_size: usize },
}

/// Token batches the model cannot process.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("{which} sequence is empty")]
    EmptySequence { which: &'static str },

    #[error("{which} sequence length {len} exceeds max_len {max_len}")]
    SequenceTooLong {
        which: &'static str,
        len: usize,
        max_len: usize,
    },

    #[error("source batch size {source_batch} does not match target batch size {target_batch}")]
    BatchMismatch {
        source_batch: usize,
        target_batch: usize,
    },

    #[error("{which} token {token} is outside the vocabulary (size {vocab_size})")]
    TokenOutOfVocab {
        which: &'static str,
        token: usize,
        vocab_size: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_problem() {
        let e = ConfigError::HeadsDoNotDivide { d_model: 10, num_heads: 4 };
        assert_eq!(e.to_string(), "d_model (10) must be divisible by num_heads (4)");

        let e = ModelError::SequenceTooLong { which: "target", len: 12, max_len: 8 };
        assert_eq!(e.to_string(), "target sequence length 12 exceeds max_len 8");
    }
}
