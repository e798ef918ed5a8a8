//! Network fee estimation.
//!
//! Size is a fixed per-input/per-output heuristic for P2PKH spends, and the
//! fee is that size priced at the node's per-kilobyte rate, rounded up to
//! the next atomic unit.

/// Fixed transaction overhead (version, counts, lock time).
pub const TX_OVERHEAD_BYTES: u64 = 10;
/// Bytes charged per input.
pub const INPUT_BYTES: u64 = 68;
/// Bytes charged per output.
pub const OUTPUT_BYTES: u64 = 31;

/// Estimated size and the fee it costs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeEstimate {
    pub size: u64,
    /// Atomic units.
    pub fee: u64,
}

/// Estimate the size in bytes of a transaction.
pub fn estimate_vsize(num_inputs: usize, num_outputs: usize) -> u64 {
    TX_OVERHEAD_BYTES + INPUT_BYTES * num_inputs as u64 + OUTPUT_BYTES * num_outputs as u64
}

/// Fee for `num_inputs`/`num_outputs` at `fee_rate_per_kb` atomic units per
/// 1000 bytes: `ceil(size * rate / 1000)`.
pub fn network_fee(num_inputs: usize, num_outputs: usize, fee_rate_per_kb: u64) -> u64 {
    estimate_network_fee(num_inputs, num_outputs, fee_rate_per_kb).fee
}

pub fn estimate_network_fee(
    num_inputs: usize,
    num_outputs: usize,
    fee_rate_per_kb: u64,
) -> FeeEstimate {
    let size = estimate_vsize(num_inputs, num_outputs);
    let product = size as u128 * fee_rate_per_kb as u128;
    let fee = product.div_ceil(1000);
    FeeEstimate {
        size,
        fee: u64::try_from(fee).unwrap_or(u64::MAX),
    }
}
