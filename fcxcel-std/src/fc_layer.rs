//! Fully-connected layer accelerator, functional level.
//!
//! The accelerator consumes a stream of 32-bit [`Message`] words. `WeightConfig` and `BiasConfig`
//! messages program the layer, and `InputData` messages fill per-batch input rows. Once a batch slot
//! has received `input_channel` inputs, the accelerator computes every output channel of that slot
//! and queues one `OutputData` word per channel, channel-ascending. Queued words are delivered one
//! per cycle under backpressure.
//!
//! Arithmetic is two's complement and never saturates: each input-by-weight product is exact, is
//! shifted right by `frac_bits` (flooring, or rounding half up when configured), and is
//! accumulated in the 18-bit output width on top of the bias.

use std::fmt;

use crate::*;

/// Accumulator of one output channel.
pub type Accum = OutputValue;

/// Accelerator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// No output pending.
    Idle,

    /// Outputs pending in the queue.
    Draining,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Idle => write!(f, "I"),
            State::Draining => write!(f, "D"),
        }
    }
}

/// What happened in one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Idle,
    Stall,
    Consume(Message),
    Deliver(Message),
}

/// Fully-connected layer accelerator.
#[derive(Debug, Clone)]
pub struct FcLayer {
    config: FcLayerConfig,

    /// Indexed by `[input_channel][output_channel]`.
    weights: Vec<Vec<WeightValue>>,
    biases: Vec<BiasValue>,

    /// Indexed by `[batch][input_channel]`.
    inputs: Vec<Vec<InputValue>>,
    input_counts: Vec<usize>,

    pending: Fifo<u32>,
    last: Action,
}

impl FcLayer {
    /// Creates a new accelerator with all storage cleared.
    pub fn new(config: FcLayerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            weights: vec![vec![WeightValue::zero(); config.output_channel]; config.input_channel],
            biases: vec![BiasValue::zero(); config.output_channel],
            inputs: vec![vec![InputValue::zero(); config.input_channel]; config.batch_size],
            input_counts: vec![0; config.batch_size],
            pending: Fifo::new(config.output_channel),
            last: Action::Idle,
        })
    }

    /// Returns the construction parameters.
    pub fn config(&self) -> &FcLayerConfig { &self.config }

    /// Returns the current state.
    pub fn state(&self) -> State {
        if self.pending.is_empty() {
            State::Idle
        } else {
            State::Draining
        }
    }

    /// Number of queued output words.
    pub fn pending_len(&self) -> usize { self.pending.len() }

    /// Queued output words, oldest first.
    pub fn pending(&self) -> impl Iterator<Item = u32> + '_ { self.pending.iter().copied() }

    /// Weight between input channel `k` and output channel `j`.
    pub fn weight(&self, k: usize, j: usize) -> Option<WeightValue> { self.weights.get(k)?.get(j).copied() }

    /// Bias of output channel `j`.
    pub fn bias(&self, j: usize) -> Option<BiasValue> { self.biases.get(j).copied() }

    /// Stored input of channel `k` in batch slot `b`.
    pub fn input(&self, b: usize, k: usize) -> Option<InputValue> { self.inputs.get(b)?.get(k).copied() }

    /// Number of inputs received by batch slot `b` since its last computation.
    pub fn input_count(&self, b: usize) -> Option<usize> { self.input_counts.get(b).copied() }

    /// Clears all storage and the pending queue.
    pub fn reset(&mut self) {
        for row in self.weights.iter_mut() {
            row.fill(WeightValue::zero());
        }
        self.biases.fill(BiasValue::zero());
        for row in self.inputs.iter_mut() {
            row.fill(InputValue::zero());
        }
        self.input_counts.fill(0);
        self.pending.clear();
        self.last = Action::Idle;
    }

    /// Returns whether an input word would be accepted under the given egress readiness.
    ///
    /// An input may complete a batch, so the queue must have room for all of its outputs.
    fn accepts(&self, egress_ready: bool) -> bool {
        egress_ready && self.pending.is_empty() && self.pending.vacancy() >= self.config.output_channel
    }

    /// Applies one input message.
    fn apply(&mut self, msg: Message) {
        let FcLayerConfig { batch_size, input_channel, output_channel, .. } = self.config;
        match msg {
            Message::WeightConfig(WeightConfig { input_idx, output_idx, value }) => {
                if input_idx.index() >= input_channel || output_idx.index() >= output_channel {
                    log::debug!("dropping {}: index out of range", msg);
                    return;
                }
                self.weights[input_idx.index()][output_idx.index()] = value;
            }
            Message::BiasConfig(BiasConfig { output_idx, value }) => {
                if output_idx.index() >= output_channel {
                    log::debug!("dropping {}: index out of range", msg);
                    return;
                }
                self.biases[output_idx.index()] = value;
            }
            Message::InputData(InputData { batch_idx, channel_idx, value }) => {
                let (b, k) = (batch_idx.index(), channel_idx.index());
                if b >= batch_size || k >= input_channel {
                    log::debug!("dropping {}: index out of range", msg);
                    return;
                }
                self.inputs[b][k] = value;
                self.input_counts[b] += 1;
                if self.input_counts[b] == input_channel {
                    self.input_counts[b] = 0;
                    self.compute(b);
                }
            }
            Message::OutputData(_) => {
                log::debug!("dropping {}: output message on the input stream", msg);
            }
        }
    }

    /// Dot product of batch slot `b` with the weights of output channel `j`, plus its bias.
    fn dot(&self, b: usize, j: usize) -> Accum {
        let FcLayerConfig { frac_bits, rounding, .. } = self.config;
        self.inputs[b]
            .iter()
            .zip(self.weights.iter())
            .fold(self.biases[j].resize::<U<18>>(), |accum, (input, row)| {
                accum.accumulate(input.mul(row[j]).rescale_with(frac_bits, rounding))
            })
    }

    /// Computes every output channel of batch slot `b` and queues the results.
    fn compute(&mut self, b: usize) {
        log::debug!("batch {} complete, computing {} outputs", b, self.config.output_channel);
        for j in 0..self.config.output_channel {
            let msg = Message::from(OutputData { batch_idx: b.into(), channel_idx: j.into(), value: self.dot(b, j) });
            if let Err(word) = self.pending.enq(msg.encode()) {
                log::error!("pending queue full, dropping {}", Message::decode(word));
            }
        }
    }
}

impl VrFsm<u32, u32> for FcLayer {
    fn step(&mut self, ingress_fwd: Valid<u32>, egress_bwd: Ready) -> (Valid<u32>, Ready) {
        let mut istream = IStreamDeqAdapter::new(ingress_fwd);
        let mut ostream = OStreamEnqAdapter::new(egress_bwd);

        self.last = if let Some(&word) = self.pending.peek() {
            ostream.enq(word);
            if ostream.rdy() {
                let _ = self.pending.deq();
                Action::Deliver(Message::decode(word))
            } else {
                Action::Stall
            }
        } else if self.accepts(ostream.rdy()) {
            match istream.deq() {
                Some(word) => {
                    let msg = Message::decode(word);
                    self.apply(msg);
                    Action::Consume(msg)
                }
                None => Action::Idle,
            }
        } else {
            Action::Stall
        };

        (ostream.into_fwd(), istream.into_bwd())
    }

    fn line_trace(&self) -> String {
        let action = match self.last {
            Action::Idle => String::new(),
            Action::Stall => "#".to_string(),
            Action::Consume(msg) => msg.to_string(),
            Action::Deliver(msg) => format!("-> {}", msg),
        };
        format!("{}({}){:<16}", self.state(), self.pending.len(), action)
    }
}
