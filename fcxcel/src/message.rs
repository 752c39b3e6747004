//! 32-bit tagged messages on the accelerator's streams.
//!
//! ```text
//!  31 30 29                                                    0
//! +-----+------------------------------------------------------+
//! | 00  | input_idx:10   | output_idx:8   | weight:12           |  WeightConfig
//! | 01  | output_idx:8   | bias:22                              |  BiasConfig
//! | 10  | batch_idx:4    | channel_idx:10 | value:16            |  InputData
//! | 11  | batch_idx:4    | channel_idx:8  | value:18            |  OutputData
//! +-----+------------------------------------------------------+
//! ```
//!
//! Index fields are unsigned; value fields are two's complement. Fields are packed MSB-first.

use std::fmt;

use arrayvec::ArrayVec;
use itertools::Itertools;
use static_assertions::const_assert_eq;

use crate::*;

/// Width of a message.
pub const MSG_WIDTH: usize = 32;

/// Width of a message payload.
pub const PAYLOAD_WIDTH: usize = MSG_WIDTH - <MsgType as Signal>::WIDTH;

/// Weight value: 12-bit, Q4.7 in the canonical format.
pub type WeightValue = Fixed<U<12>>;
/// Bias value.
pub type BiasValue = Fixed<U<22>>;
/// Input activation value.
pub type InputValue = Fixed<U<16>>;
/// Output value.
pub type OutputValue = Fixed<U<18>>;

/// Batch slot index.
pub type BatchIdx = Bits<U<4>>;
/// Input channel index.
pub type InChannelIdx = Bits<U<10>>;
/// Output channel index.
pub type OutChannelIdx = Bits<U<8>>;

/// Message type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Signal)]
#[width(2)]
pub enum MsgType {
    /// Weight configuration.
    Weight,
    /// Bias configuration.
    Bias,
    /// Input activation.
    Input,
    /// Computed output.
    Output,
}

/// Weight configuration payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Signal)]
pub struct WeightConfig {
    /// Input channel (row of the weight matrix).
    pub input_idx: InChannelIdx,
    /// Output channel (column of the weight matrix).
    pub output_idx: OutChannelIdx,
    /// Weight.
    pub value: WeightValue,
}

/// Bias configuration payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Signal)]
pub struct BiasConfig {
    /// Output channel.
    pub output_idx: OutChannelIdx,
    /// Bias.
    pub value: BiasValue,
}

/// Input activation payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Signal)]
pub struct InputData {
    /// Batch slot.
    pub batch_idx: BatchIdx,
    /// Input channel.
    pub channel_idx: InChannelIdx,
    /// Activation.
    pub value: InputValue,
}

/// Output payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Signal)]
pub struct OutputData {
    /// Batch slot.
    pub batch_idx: BatchIdx,
    /// Output channel.
    pub channel_idx: OutChannelIdx,
    /// Result.
    pub value: OutputValue,
}

const_assert_eq!(<WeightConfig as Signal>::WIDTH, PAYLOAD_WIDTH);
const_assert_eq!(<BiasConfig as Signal>::WIDTH, PAYLOAD_WIDTH);
const_assert_eq!(<InputData as Signal>::WIDTH, PAYLOAD_WIDTH);
const_assert_eq!(<OutputData as Signal>::WIDTH, PAYLOAD_WIDTH);
const_assert_eq!(QFormat::Q4_7.width(), <WeightValue as Signal>::WIDTH);

impl WeightConfig {
    /// Creates a new payload. Arguments are truncated to their field widths.
    pub fn new(input_idx: usize, output_idx: usize, value: i64) -> Self {
        Self { input_idx: input_idx.into(), output_idx: output_idx.into(), value: Fixed::new(value) }
    }
}

impl BiasConfig {
    /// Creates a new payload. Arguments are truncated to their field widths.
    pub fn new(output_idx: usize, value: i64) -> Self { Self { output_idx: output_idx.into(), value: Fixed::new(value) } }
}

impl InputData {
    /// Creates a new payload. Arguments are truncated to their field widths.
    pub fn new(batch_idx: usize, channel_idx: usize, value: i64) -> Self {
        Self { batch_idx: batch_idx.into(), channel_idx: channel_idx.into(), value: Fixed::new(value) }
    }
}

impl OutputData {
    /// Creates a new payload. Arguments are truncated to their field widths.
    pub fn new(batch_idx: usize, channel_idx: usize, value: i64) -> Self {
        Self { batch_idx: batch_idx.into(), channel_idx: channel_idx.into(), value: Fixed::new(value) }
    }
}

/// Message on the accelerator's streams.
#[allow(variant_size_differences)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Message {
    /// Weight configuration.
    WeightConfig(WeightConfig),
    /// Bias configuration.
    BiasConfig(BiasConfig),
    /// Input activation.
    InputData(InputData),
    /// Computed output.
    OutputData(OutputData),
}

impl Message {
    /// Returns the type tag.
    pub fn typ(&self) -> MsgType {
        match self {
            Message::WeightConfig(_) => MsgType::Weight,
            Message::BiasConfig(_) => MsgType::Bias,
            Message::InputData(_) => MsgType::Input,
            Message::OutputData(_) => MsgType::Output,
        }
    }

    /// Decodes a wire word. Every word decodes to some message.
    pub fn decode(word: u32) -> Self {
        let bits = u64::from(word);
        let payload = bits & mask(PAYLOAD_WIDTH);
        match MsgType::from_bits(bits >> PAYLOAD_WIDTH) {
            MsgType::Weight => Message::WeightConfig(WeightConfig::from_bits(payload)),
            MsgType::Bias => Message::BiasConfig(BiasConfig::from_bits(payload)),
            MsgType::Input => Message::InputData(InputData::from_bits(payload)),
            MsgType::Output => Message::OutputData(OutputData::from_bits(payload)),
        }
    }

    /// Encodes into a wire word.
    pub fn encode(self) -> u32 {
        let payload = match self {
            Message::WeightConfig(m) => m.transl(),
            Message::BiasConfig(m) => m.transl(),
            Message::InputData(m) => m.transl(),
            Message::OutputData(m) => m.transl(),
        };
        ((self.typ().transl() << PAYLOAD_WIDTH) | payload) as u32
    }

    /// Returns the numeric fields in wire order: indices first, value last.
    pub fn fields(&self) -> ArrayVec<i64, 3> {
        let mut fields = ArrayVec::new();
        match self {
            Message::WeightConfig(m) => {
                fields.push(m.input_idx.value() as i64);
                fields.push(m.output_idx.value() as i64);
                fields.push(m.value.raw());
            }
            Message::BiasConfig(m) => {
                fields.push(m.output_idx.value() as i64);
                fields.push(m.value.raw());
            }
            Message::InputData(m) => {
                fields.push(m.batch_idx.value() as i64);
                fields.push(m.channel_idx.value() as i64);
                fields.push(m.value.raw());
            }
            Message::OutputData(m) => {
                fields.push(m.batch_idx.value() as i64);
                fields.push(m.channel_idx.value() as i64);
                fields.push(m.value.raw());
            }
        }
        fields
    }
}

impl Signal for Message {
    const WIDTH: usize = MSG_WIDTH;

    fn transl(self) -> u64 { u64::from(self.encode()) }

    fn from_bits(bits: u64) -> Self { Self::decode(bits as u32) }
}

impl From<u32> for Message {
    fn from(word: u32) -> Self { Self::decode(word) }
}

impl From<Message> for u32 {
    fn from(msg: Message) -> Self { msg.encode() }
}

impl From<WeightConfig> for Message {
    fn from(m: WeightConfig) -> Self { Message::WeightConfig(m) }
}

impl From<BiasConfig> for Message {
    fn from(m: BiasConfig) -> Self { Message::BiasConfig(m) }
}

impl From<InputData> for Message {
    fn from(m: InputData) -> Self { Message::InputData(m) }
}

impl From<OutputData> for Message {
    fn from(m: OutputData) -> Self { Message::OutputData(m) }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self.fields();
        let (value, indices) = some_or!(fields.split_last(), return Ok(()));
        let prefix = match self.typ() {
            MsgType::Weight => "W",
            MsgType::Bias => "B",
            MsgType::Input => "I",
            MsgType::Output => "O",
        };
        write!(f, "{}[{}]={}", prefix, indices.iter().join(":"), value)
    }
}

/// Encodes a weight configuration message.
pub fn mk_weight_msg(input_idx: usize, output_idx: usize, value: i64) -> u32 {
    Message::from(WeightConfig::new(input_idx, output_idx, value)).encode()
}

/// Encodes a bias configuration message.
pub fn mk_bias_msg(output_idx: usize, value: i64) -> u32 { Message::from(BiasConfig::new(output_idx, value)).encode() }

/// Encodes an input data message.
pub fn mk_input_msg(batch_idx: usize, channel_idx: usize, value: i64) -> u32 {
    Message::from(InputData::new(batch_idx, channel_idx, value)).encode()
}

/// Encodes an output data message.
pub fn mk_output_msg(batch_idx: usize, channel_idx: usize, value: i64) -> u32 {
    Message::from(OutputData::new(batch_idx, channel_idx, value)).encode()
}
