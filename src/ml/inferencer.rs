// ============================================================
// Greedy decoding
// ============================================================
// Autoregressive generation on top of Transformer::encode/decode:
//
//   1. encode the source once
//   2. start every row with [BOS]
//   3. run the decoder on the prefix, take argmax of the last
//      position, append it
//   4. stop when every row has produced [EOS], after max_steps,
//      or when the prefix reaches max_len
//
// Rows that finished early keep emitting the filler token
// (pad_token if the model has one, otherwise EOS) so the batch
// stays rectangular.

use burn::prelude::*;

use crate::domain::error::ModelError;
use crate::ml::model::Transformer;

#[derive(Debug, Clone)]
pub struct GreedyDecoder {
    pub bos:       usize,
    pub eos:       Option<usize>,
    pub max_steps: usize,
}

impl GreedyDecoder {
    pub fn new(bos: usize, max_steps: usize) -> Self {
        Self { bos, eos: None, max_steps }
    }

    pub fn with_eos(mut self, eos: usize) -> Self {
        self.eos = Some(eos);
        self
    }

    /// source: [batch, src_len] → tokens [batch, 1 + generated], first column is BOS.
    pub fn decode<B: Backend>(
        &self,
        model:  &Transformer<B>,
        source: Tensor<B, 2, Int>,
    ) -> Result<Tensor<B, 2, Int>, ModelError> {
        model.check_source(source.dims())?;
        model.check_tokens("source", &source)?;
        self.check_vocab(model.vocab_size)?;

        let [batch_size, _] = source.dims();
        let device = source.device();
        let encoded = model.encode(source);

        let mut tokens = Tensor::<B, 2, Int>::full([batch_size, 1], self.bos as i64, &device);
        let mut finished = Tensor::<B, 2, Int>::zeros([batch_size, 1], &device);
        let filler = model.pad_token.or(self.eos).unwrap_or(self.bos) as i64;

        for step in 0..self.max_steps {
            let [_, len] = tokens.dims();
            if len >= model.max_len {
                tracing::debug!("Greedy decode hit max_len {} at step {}", model.max_len, step);
                break;
            }

            let logits = model.decode(tokens.clone(), &encoded);
            let last = logits
                .slice([0..batch_size, len - 1..len, 0..model.vocab_size])
                .reshape([batch_size, model.vocab_size]);
            let next = last
                .argmax(1)
                .mask_fill(finished.clone().greater_elem(0), filler);
            tokens = Tensor::cat(vec![tokens, next.clone()], 1);

            if let Some(eos) = self.eos {
                finished = (finished + next.equal_elem(eos as i64).int())
                    .greater_elem(0)
                    .int();
                let done = finished.clone().sum().into_scalar().elem::<i64>();
                if done as usize == batch_size {
                    tracing::debug!("All {} rows reached EOS after {} steps", batch_size, step + 1);
                    break;
                }
            }
        }

        Ok(tokens)
    }

    fn check_vocab(&self, vocab_size: usize) -> Result<(), ModelError> {
        let specials = [("bos", Some(self.bos)), ("eos", self.eos)];
        for (which, token) in specials {
            if let Some(token) = token.filter(|t| *t >= vocab_size) {
                return Err(ModelError::TokenOutOfVocab { which, token, vocab_size });
            }
        }
        Ok(())
    }
}
