// ============================================================
// Backend aliases
// ============================================================
// Burn models are generic over a Backend. These aliases name the
// ones this crate is built and tested against:
//
//   CpuBackend      — NdArray, used by the unit tests
//   GpuBackend      — Wgpu, for real workloads
//   *AutodiffBackend — the same backends wrapped in Autodiff,
//                      required by Transformer::forward_loss + backward
//
// Dropout is only active on autodiff backends; on the plain
// backends every forward pass is deterministic.

pub type CpuBackend = burn::backend::NdArray;
pub type CpuAutodiffBackend = burn::backend::Autodiff<CpuBackend>;

pub type GpuBackend = burn::backend::Wgpu;
pub type GpuAutodiffBackend = burn::backend::Autodiff<GpuBackend>;
