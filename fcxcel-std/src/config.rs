//! Construction parameters of the fully-connected layer accelerator.

use std::path::Path;
use std::{fs, io};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::*;

#[allow(missing_docs)]
#[allow(variant_size_differences)]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("`{name}` must be at least 1")]
    Empty { name: &'static str },

    #[error("`{name}` = {value} exceeds {limit}, the most its message field can address")]
    TooLarge { name: &'static str, value: usize, limit: usize },

    #[error("`frac_bits` = {frac_bits} must be smaller than the {width}-bit product width")]
    FracBits { frac_bits: u32, width: usize },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to read config: {0}")]
    Io(#[from] io::Error),
}

/// Width of an input-by-weight product.
pub const PRODUCT_WIDTH: usize = <InputValue as Signal>::WIDTH + <WeightValue as Signal>::WIDTH;

/// Fully-connected layer parameters, fixed at construction.
///
/// ```toml
/// batch_size = 8
/// input_channel = 32
/// output_channel = 32
/// frac_bits = 7
/// rounding = "half_up"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FcLayerConfig {
    /// Number of batch slots.
    pub batch_size: usize,

    /// Number of input channels.
    pub input_channel: usize,

    /// Number of output channels.
    pub output_channel: usize,

    /// Right shift applied to every input-by-weight product.
    ///
    /// This is the number of fraction bits of the operands: 7 for Q4.7, 0 for plain integers.
    pub frac_bits: u32,

    /// How the shifted-out bits of each product are dropped. Floors unless set.
    pub rounding: Rounding,
}

impl Default for FcLayerConfig {
    fn default() -> Self {
        Self {
            batch_size: 4,
            input_channel: 3,
            output_channel: 2,
            frac_bits: QFormat::Q4_7.frac_bits,
            rounding: Rounding::Floor,
        }
    }
}

impl FcLayerConfig {
    /// Creates a new Q4.7 config.
    pub fn new(batch_size: usize, input_channel: usize, output_channel: usize) -> Self {
        Self { batch_size, input_channel, output_channel, ..Self::default() }
    }

    /// Replaces the product shift.
    pub fn with_frac_bits(self, frac_bits: u32) -> Self { Self { frac_bits, ..self } }

    /// Replaces the product rounding.
    pub fn with_rounding(self, rounding: Rounding) -> Self { Self { rounding, ..self } }

    /// Checks that every dimension is addressable by the message fields.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let dims = [
            ("batch_size", self.batch_size, BatchIdx::MAX as usize + 1),
            ("input_channel", self.input_channel, InChannelIdx::MAX as usize + 1),
            ("output_channel", self.output_channel, OutChannelIdx::MAX as usize + 1),
        ];
        for (name, value, limit) in dims {
            if value == 0 {
                return Err(ConfigError::Empty { name });
            }
            if value > limit {
                return Err(ConfigError::TooLarge { name, value, limit });
            }
        }
        if self.frac_bits as usize >= PRODUCT_WIDTH {
            return Err(ConfigError::FracBits { frac_bits: self.frac_bits, width: PRODUCT_WIDTH });
        }
        Ok(())
    }

    /// Parses and validates a TOML config. Missing keys take their default values.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config = toml::from_str::<Self>(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> { Self::from_toml_str(&fs::read_to_string(path)?) }
}
