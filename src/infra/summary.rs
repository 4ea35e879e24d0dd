// ============================================================
// Model Summary
// ============================================================
// Parameter counts per component of a built Transformer,
// serialisable so it can be logged or written next to a config.
//
// Example JSON:
//   {
//     "vocab_size": 8000, "max_len": 128,
//     "encoder_blocks": 6, "decoder_blocks": 6,
//     "embedding_params": 4096000, ...
//   }

use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub vocab_size:       usize,
    pub max_len:          usize,
    pub encoder_blocks:   usize,
    pub decoder_blocks:   usize,
    /// Shared source/target embedding table
    pub embedding_params: usize,
    pub encoder_params:   usize,
    pub decoder_params:   usize,
    /// Final projection to vocabulary logits
    pub output_params:    usize,
    /// Everything the module tree reports; the positional table is a
    /// constant and is not counted
    pub total_params:     usize,
}

impl ModelSummary {
    /// Sum of the four trainable components.
    pub fn component_params(&self) -> usize {
        self.embedding_params + self.encoder_params + self.decoder_params + self.output_params
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Emit the summary at INFO level.
    pub fn log(&self) {
        tracing::info!(
            "Model: {} enc / {} dec blocks | embedding={} encoder={} decoder={} output={} | total={}",
            self.encoder_blocks,
            self.decoder_blocks,
            self.embedding_params,
            self.encoder_params,
            self.decoder_params,
            self.output_params,
            self.total_params,
        );
    }
}
