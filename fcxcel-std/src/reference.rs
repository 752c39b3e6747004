//! Reference models and test vectors for the fully-connected layer.

use std::ops::RangeInclusive;

use rand::Rng;
use thiserror::Error;

use crate::*;

/// Largest output error, in LSBs, accepted against a floating-point reference.
pub const EVAL_TOLERANCE: i64 = 20;

/// Fixed-point dense layer: `out[b][j] = bias[j] + sum_k (in[b][k] * w[k][j]) >> frac_bits`.
///
/// With [`Rounding::HalfUp`] each product gets half an output LSB added before the shift. Sums wrap
/// at the output width. Missing weights read as zero.
pub fn fc_layer_fixed(
    inputs: &[Vec<i64>], weights: &[Vec<i64>], biases: &[i64], frac_bits: u32, rounding: Rounding,
) -> Vec<Vec<i64>> {
    let shift = frac_bits.min(63);
    let half = match rounding {
        Rounding::HalfUp if shift > 0 => 1i64 << (shift - 1),
        _ => 0,
    };
    inputs
        .iter()
        .map(|input| {
            biases
                .iter()
                .enumerate()
                .map(|(j, &bias)| {
                    let sum = input.iter().zip(weights).fold(bias, |sum, (&x, row)| {
                        let w = row.get(j).copied().unwrap_or(0);
                        sum.wrapping_add(x.wrapping_mul(w).wrapping_add(half) >> shift)
                    });
                    sext(sum as u64, <OutputValue as Signal>::WIDTH)
                })
                .collect()
        })
        .collect()
}

/// Floating-point dense layer: `out[b][j] = bias[j] + sum_k in[b][k] * w[k][j]`.
pub fn fc_layer_f32(inputs: &[Vec<f32>], weights: &[Vec<f32>], biases: &[f32]) -> Vec<Vec<f32>> {
    inputs
        .iter()
        .map(|input| {
            biases
                .iter()
                .enumerate()
                .map(|(j, &bias)| {
                    input.iter().zip(weights).fold(bias, |sum, (&x, row)| sum + x * row.get(j).copied().unwrap_or(0.0))
                })
                .collect()
        })
        .collect()
}

/// Returns whether `actual` and `expected` have the same length and differ by at most `tolerance`
/// element-wise. A negative tolerance accepts nothing.
pub fn within_tolerance(actual: &[i64], expected: &[i64], tolerance: i64) -> bool {
    let Ok(tolerance) = u64::try_from(tolerance) else {
        return false;
    };
    actual.len() == expected.len() && actual.iter().zip(expected).all(|(a, e)| a.abs_diff(*e) <= tolerance)
}

/// Rectified linear unit.
pub fn relu(x: i64) -> i64 { x.max(0) }

/// Weights and biases of one layer of a multi-layer perceptron, as raw field values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenseLayer {
    /// Indexed by `[input_channel][output_channel]`.
    pub weights: Vec<Vec<i64>>,

    /// One per output channel.
    pub biases: Vec<i64>,
}

impl DenseLayer {
    /// Quantizes a floating-point layer with `frac_bits` fraction bits.
    pub fn from_f32(weights: &[Vec<f32>], biases: &[f32], frac_bits: u32) -> Self {
        Self {
            weights: weights
                .iter()
                .map(|row| row.iter().map(|&w| WeightValue::from_f32(w, frac_bits).raw()).collect())
                .collect(),
            biases: biases.iter().map(|&b| BiasValue::from_f32(b, frac_bits).raw()).collect(),
        }
    }

    /// Number of input channels.
    pub fn input_channel(&self) -> usize { self.weights.len() }

    /// Number of output channels.
    pub fn output_channel(&self) -> usize { self.biases.len() }
}

/// Fixed-point multi-layer perceptron with round-half-up products.
///
/// Every layer but the last is followed by ReLU, and its activations are wrapped into the input
/// field width before they feed the next layer. Returns the last layer's outputs, one row per batch.
pub fn mlp_fixed(inputs: &[Vec<i64>], layers: &[DenseLayer], frac_bits: u32) -> Vec<Vec<i64>> {
    let mut activations = inputs.to_vec();
    for (n, layer) in layers.iter().enumerate() {
        activations = fc_layer_fixed(&activations, &layer.weights, &layer.biases, frac_bits, Rounding::HalfUp);
        if n + 1 < layers.len() {
            for row in activations.iter_mut() {
                for y in row.iter_mut() {
                    *y = sext(relu(*y) as u64, <InputValue as Signal>::WIDTH);
                }
            }
        }
    }
    activations
}

#[allow(missing_docs)]
#[allow(variant_size_differences)]
#[derive(Debug, Error)]
pub enum TestVectorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{what} has {actual} entries, expected {expected}")]
    Shape { what: &'static str, expected: usize, actual: usize },

    #[error("{what} is out of range: {source}")]
    Value {
        what: &'static str,
        #[source]
        source: FixedError,
    },
}

/// A dense layer together with the batches to run through it.
///
/// Values are raw two's-complement integers in the units of their message fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestVector {
    /// Layer parameters.
    pub config: FcLayerConfig,

    /// Indexed by `[input_channel][output_channel]`.
    pub weights: Vec<Vec<i64>>,

    /// One per output channel.
    pub biases: Vec<i64>,

    /// One row of `input_channel` values per batch.
    pub batches: Vec<Vec<i64>>,
}

fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<(), TestVectorError> {
    if expected != actual {
        return Err(TestVectorError::Shape { what, expected, actual });
    }
    Ok(())
}

fn check_values<N: Num>(what: &'static str, values: &[i64]) -> Result<(), TestVectorError> {
    for &value in values {
        Fixed::<N>::checked(value).map_err(|source| TestVectorError::Value { what, source })?;
    }
    Ok(())
}

impl TestVector {
    /// Creates a test vector, checking shapes and value ranges against `config`.
    pub fn from_raw(
        config: FcLayerConfig, weights: Vec<Vec<i64>>, biases: Vec<i64>, batches: Vec<Vec<i64>>,
    ) -> Result<Self, TestVectorError> {
        config.validate()?;
        check_len("weights", config.input_channel, weights.len())?;
        for row in &weights {
            check_len("weight row", config.output_channel, row.len())?;
            check_values::<U<12>>("weight", row)?;
        }
        check_len("biases", config.output_channel, biases.len())?;
        check_values::<U<22>>("bias", &biases)?;
        for batch in &batches {
            check_len("batch", config.input_channel, batch.len())?;
            check_values::<U<16>>("input", batch)?;
        }
        Ok(Self { config, weights, biases, batches })
    }

    /// Quantizes a floating-point layer with `config.frac_bits` fraction bits, saturating at each
    /// field's range.
    pub fn from_f32(
        config: FcLayerConfig, weights: &[Vec<f32>], biases: &[f32], batches: &[Vec<f32>],
    ) -> Result<Self, TestVectorError> {
        let frac_bits = config.frac_bits;
        let weights = weights
            .iter()
            .map(|row| row.iter().map(|&w| WeightValue::from_f32(w, frac_bits).raw()).collect())
            .collect();
        let biases = biases.iter().map(|&b| BiasValue::from_f32(b, frac_bits).raw()).collect();
        let batches = batches
            .iter()
            .map(|batch| batch.iter().map(|&x| InputValue::from_f32(x, frac_bits).raw()).collect())
            .collect();
        Self::from_raw(config, weights, biases, batches)
    }

    /// Creates a random layer with `num_batches` batches. Each value is drawn uniformly from the
    /// part of `range` its field can hold.
    pub fn random<R: Rng>(
        config: FcLayerConfig, num_batches: usize, range: RangeInclusive<i64>, rng: &mut R,
    ) -> Result<Self, TestVectorError> {
        let mut draw = |min: i64, max: i64| -> i64 {
            let (lo, hi) = ((*range.start()).max(min), (*range.end()).min(max));
            if lo > hi {
                return (*range.start()).clamp(min, max);
            }
            rng.random_range(lo..=hi)
        };
        let weights = (0..config.input_channel)
            .map(|_| (0..config.output_channel).map(|_| draw(WeightValue::MIN, WeightValue::MAX)).collect())
            .collect();
        let biases = (0..config.output_channel).map(|_| draw(BiasValue::MIN, BiasValue::MAX)).collect();
        let batches = (0..num_batches)
            .map(|_| (0..config.input_channel).map(|_| draw(InputValue::MIN, InputValue::MAX)).collect())
            .collect();
        Self::from_raw(config, weights, biases, batches)
    }

    /// Batch slot used by the `n`-th batch.
    pub fn slot(&self, n: usize) -> usize { n % self.config.batch_size }

    /// Input stream: weights, then biases, then each batch channel-ascending.
    pub fn input_msgs(&self) -> Vec<u32> {
        let weights = self
            .weights
            .iter()
            .enumerate()
            .flat_map(|(k, row)| row.iter().enumerate().map(move |(j, &w)| mk_weight_msg(k, j, w)));
        let biases = self.biases.iter().enumerate().map(|(j, &b)| mk_bias_msg(j, b));
        let inputs = self.batches.iter().enumerate().flat_map(|(n, batch)| {
            let slot = self.slot(n);
            batch.iter().enumerate().map(move |(k, &x)| mk_input_msg(slot, k, x))
        });
        weights.chain(biases).chain(inputs).collect()
    }

    /// Expected output values, one row per batch.
    pub fn expected(&self) -> Vec<Vec<i64>> {
        fc_layer_fixed(&self.batches, &self.weights, &self.biases, self.config.frac_bits, self.config.rounding)
    }

    /// Expected output stream.
    pub fn output_msgs(&self) -> Vec<u32> {
        self.expected()
            .iter()
            .enumerate()
            .flat_map(|(n, row)| {
                let slot = self.slot(n);
                row.iter().enumerate().map(move |(j, &y)| mk_output_msg(slot, j, y))
            })
            .collect()
    }
}
