//! Systolic processing element.

/// Input ports of a processing element.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PeIn {
    /// Stationary weight.
    pub weight_in: u32,

    /// Activation from the previous PE.
    pub act_in: u32,

    /// Partial sum from the previous PE.
    pub sum_in: u32,
}

/// Output ports of a processing element.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PeOut {
    /// Forwarded activation.
    pub act_out: u32,

    /// Updated partial sum.
    pub sum_out: u32,
}

/// Multiply-accumulate: `sum_out = weight_in * act_in + sum_in`, wrapping at 32 bits.
pub fn systolic_pe(i: PeIn) -> PeOut {
    PeOut { act_out: i.act_in, sum_out: i.weight_in.wrapping_mul(i.act_in).wrapping_add(i.sum_in) }
}

/// Chain of PEs computing one output column.
///
/// PE `k` holds `weights[k]` and receives `acts[k]`. Its `sum_out` feeds the `sum_in` of PE `k + 1`,
/// and the first PE starts from `sum_in`. Returns the last `sum_out`.
pub fn systolic_column(weights: &[u32], acts: &[u32], sum_in: u32) -> u32 {
    weights
        .iter()
        .zip(acts)
        .fold(sum_in, |sum_in, (&weight_in, &act_in)| systolic_pe(PeIn { weight_in, act_in, sum_in }).sum_out)
}

/// Array of columns, one per output channel.
///
/// `weights` is indexed by `[input_channel][output_channel]`. Column `j` starts from `sums[j]`.
pub fn systolic_array(weights: &[Vec<u32>], acts: &[u32], sums: &[u32]) -> Vec<u32> {
    sums.iter()
        .enumerate()
        .map(|(j, &sum_in)| {
            let column = weights.iter().map(|row| row.get(j).copied().unwrap_or(0)).collect::<Vec<_>>();
            systolic_column(&column, acts, sum_in)
        })
        .collect()
}
