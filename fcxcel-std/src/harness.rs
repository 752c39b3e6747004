//! Stream source and sink for driving a valid-ready component cycle by cycle.

use std::fmt;

use thiserror::Error;

use crate::*;

/// Cycles simulated after both ends are done, to catch late extra outputs.
const TAIL_CYCLES: usize = 3;

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    #[error("cycle {cycle}: output #{index} is {actual}, expected {expected}")]
    Mismatch { cycle: usize, index: usize, expected: Message, actual: Message },

    #[error("cycle {cycle}: unexpected output {actual} after all {received} expected outputs")]
    Unexpected { cycle: usize, received: usize, actual: Message },

    #[error("timed out after {cycles} cycles with {received} of {expected} outputs received")]
    Timeout { cycles: usize, received: usize, expected: usize },
}

/// Simulation statistics.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SimStats {
    /// Simulated cycles, excluding the tail.
    pub cycles: usize,

    /// Messages transferred from the source.
    pub transfers_in: usize,

    /// Messages transferred to the sink.
    pub transfers_out: usize,
}

impl fmt::Display for SimStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} cycles, {} in, {} out", self.cycles, self.transfers_in, self.transfers_out)
    }
}

/// Counts down the delay before the next transfer.
#[derive(Debug, Clone, Copy)]
struct Delay {
    interval: usize,
    count: usize,
}

impl Delay {
    fn new(initial: usize, interval: usize) -> Self { Self { interval, count: initial } }

    fn expired(&self) -> bool { self.count == 0 }

    fn tick(&mut self, fired: bool) {
        if fired {
            self.count = self.interval;
        } else if self.count > 0 {
            self.count -= 1;
        }
    }
}

/// Formats the message moved through a channel in the last cycle.
fn trace_word(fwd: Valid<u32>, bwd: Ready) -> String {
    match (fwd.valid, bwd.ready) {
        (true, true) => Message::decode(fwd.inner).to_string(),
        (true, false) => "#".to_string(),
        (false, _) => ".".to_string(),
    }
}

/// Offers a fixed sequence of messages.
#[derive(Debug, Clone)]
pub struct StreamSource {
    msgs: Vec<u32>,
    next: usize,
    delay: Delay,
    trace: String,
}

impl StreamSource {
    /// Creates a source that waits `initial_delay` cycles before the first message and
    /// `interval_delay` cycles after each transfer.
    pub fn new(msgs: Vec<u32>, initial_delay: usize, interval_delay: usize) -> Self {
        Self { msgs, next: 0, delay: Delay::new(initial_delay, interval_delay), trace: String::new() }
    }

    /// Forward signals for this cycle.
    pub fn fwd(&self) -> Valid<u32> {
        match self.msgs.get(self.next) {
            Some(&word) if self.delay.expired() => Valid::valid(word),
            _ => Valid::invalid(),
        }
    }

    /// Ends the cycle. Returns whether a message was transferred.
    pub fn tick(&mut self, bwd: Ready) -> bool {
        let fwd = self.fwd();
        let fired = fwd.fire(bwd);
        self.trace = trace_word(fwd, bwd);
        if fired {
            self.next += 1;
        }
        self.delay.tick(fired);
        fired
    }

    /// Returns whether every message has been sent.
    pub fn done(&self) -> bool { self.next >= self.msgs.len() }

    /// One-line description of the last cycle.
    pub fn line_trace(&self) -> String { format!("{:>16}", self.trace) }
}

/// Accepts messages and checks them against an expected sequence.
#[derive(Debug, Clone)]
pub struct StreamSink {
    expected: Vec<u32>,
    received: usize,
    delay: Delay,
    trace: String,
}

impl StreamSink {
    /// Creates a sink that waits `initial_delay` cycles before accepting the first message and
    /// `interval_delay` cycles after each transfer.
    pub fn new(expected: Vec<u32>, initial_delay: usize, interval_delay: usize) -> Self {
        Self { expected, received: 0, delay: Delay::new(initial_delay, interval_delay), trace: String::new() }
    }

    /// Backward signals for this cycle.
    pub fn bwd(&self) -> Ready { Ready::new(self.delay.expired()) }

    /// Ends the cycle, checking a transferred message. Returns whether a message was transferred.
    pub fn tick(&mut self, fwd: Valid<u32>, cycle: usize) -> Result<bool, SimError> {
        let bwd = self.bwd();
        let fired = fwd.fire(bwd);
        self.trace = trace_word(fwd, bwd);
        self.delay.tick(fired);
        if !fired {
            return Ok(false);
        }

        let actual = Message::decode(fwd.inner);
        let expected = some_or!(self.expected.get(self.received).copied(), {
            return Err(SimError::Unexpected { cycle, received: self.received, actual });
        });
        if expected != fwd.inner {
            return Err(SimError::Mismatch { cycle, index: self.received, expected: Message::decode(expected), actual });
        }
        self.received += 1;
        Ok(true)
    }

    /// Number of messages received so far.
    pub fn received(&self) -> usize { self.received }

    /// Returns whether every expected message has been received.
    pub fn done(&self) -> bool { self.received >= self.expected.len() }

    /// One-line description of the last cycle.
    pub fn line_trace(&self) -> String { format!("{:<16}", self.trace) }
}

/// Splits a mixed message list into the input stream and the expected `OutputData` stream.
pub fn split_msgs(msgs: &[u32]) -> (Vec<u32>, Vec<u32>) {
    msgs.iter().partition(|&&word| Message::decode(word).typ() != MsgType::Output)
}

/// Drives `dut` between `src` and `sink` until both are done.
///
/// Each cycle is logged at `trace` level as `src > dut > sink`.
pub fn run_sim<D: VrFsm<u32, u32>>(
    dut: &mut D, src: &mut StreamSource, sink: &mut StreamSink, max_cycles: usize,
) -> Result<SimStats, SimError> {
    let mut stats = SimStats::default();
    let mut tail = 0;
    let mut cycle = 0;
    while tail < TAIL_CYCLES {
        if src.done() && sink.done() {
            tail += 1;
        } else if cycle >= max_cycles {
            return Err(SimError::Timeout { cycles: cycle, received: sink.received(), expected: sink.expected.len() });
        } else {
            stats.cycles = cycle + 1;
        }

        let (dut_fwd, dut_bwd) = dut.step(src.fwd(), sink.bwd());
        if src.tick(dut_bwd) {
            stats.transfers_in += 1;
        }
        if sink.tick(dut_fwd, cycle)? {
            stats.transfers_out += 1;
        }
        log::trace!("{:>4}: {} > {} > {}", cycle, src.line_trace(), dut.line_trace(), sink.line_trace());
        cycle += 1;
    }
    log::debug!("simulation passed: {}", stats);
    Ok(stats)
}
