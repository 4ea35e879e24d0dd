// ============================================================
// Attention masks
// ============================================================
// Every mask is a Bool tensor of shape [batch, q_len, k_len]
// where `true` means "this query must NOT attend to this key".
// MultiHeadAttention broadcasts it across heads.
//
//   causal_mask   — decoder self-attention: no peeking at
//                   later target positions
//   padding_mask  — any attention whose keys contain [PAD]
//   self_padding_mask — padding mask for self-attention; a
//                   query always keeps its own key, so a row
//                   is never fully masked

use burn::prelude::*;

/// [batch, seq_len, seq_len], true strictly above the diagonal.
pub fn causal_mask<B: Backend>(
    batch_size: usize,
    seq_len:    usize,
    device:     &B::Device,
) -> Tensor<B, 3, Bool> {
    let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, device);
    let query_pos = positions.clone().reshape([seq_len, 1]).expand([seq_len, seq_len]);
    let key_pos   = positions.reshape([1, seq_len]).expand([seq_len, seq_len]);

    key_pos
        .greater(query_pos)
        .unsqueeze::<3>()
        .expand([batch_size, seq_len, seq_len])
}

/// ids: [batch, k_len] → [batch, q_len, k_len], true where the key is `pad_token`.
pub fn padding_mask<B: Backend>(
    ids:       Tensor<B, 2, Int>,
    pad_token: usize,
    q_len:     usize,
) -> Tensor<B, 3, Bool> {
    let [batch_size, k_len] = ids.dims();
    ids.equal_elem(pad_token as i64)
        .unsqueeze_dim::<3>(1)
        .expand([batch_size, q_len, k_len])
}

/// ids: [batch, seq_len] → [batch, seq_len, seq_len], true where the key is
/// `pad_token` and is not the query's own position.
///
/// Combined with `causal_mask`, every query keeps at least one visible key,
/// so a left-padded prefix cannot spill softmax weight onto future positions.
pub fn self_padding_mask<B: Backend>(ids: Tensor<B, 2, Int>, pad_token: usize) -> Tensor<B, 3, Bool> {
    let [batch_size, seq_len] = ids.dims();
    let device = ids.device();

    let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &device);
    let query_pos = positions.clone().reshape([seq_len, 1]).expand([seq_len, seq_len]);
    let key_pos   = positions.reshape([1, seq_len]).expand([seq_len, seq_len]);
    let off_diagonal = key_pos
        .not_equal(query_pos)
        .int()
        .unsqueeze::<3>()
        .expand([batch_size, seq_len, seq_len]);

    padding_mask(ids, pad_token, seq_len)
        .int()
        .mul(off_diagonal)
        .greater_elem(0)
}

/// Positions masked by either input.
pub fn combine<B: Backend>(a: Tensor<B, 3, Bool>, b: Tensor<B, 3, Bool>) -> Tensor<B, 3, Bool> {
    a.int().add(b.int()).greater_elem(0)
}

/// Optional variant of `combine`.
pub fn combine_opt<B: Backend>(
    a: Option<Tensor<B, 3, Bool>>,
    b: Option<Tensor<B, 3, Bool>>,
) -> Option<Tensor<B, 3, Bool>> {
    match (a, b) {
        (Some(a), Some(b)) => Some(combine(a, b)),
        (a, b) => a.or(b),
    }
}
