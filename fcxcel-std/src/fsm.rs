//! Finite state machine (Mealy machine) between two valid-ready channels.

use crate::*;

/// Cycle-stepped component with one ingress and one egress valid-ready channel.
///
/// `step` is called once per cycle by an external driver. It computes (1) the current-cycle
/// outputs, the egress forward and ingress backward signals, from the current-cycle inputs and the
/// state; and (2) the next-cycle state. The state may change only on transfer cycles: an ingress
/// message is consumed only if it is valid and the returned `Ready` is asserted, and an egress
/// message leaves only if the returned `Valid` is asserted and `egress_bwd` is ready.
///
/// The returned ingress `Ready` may depend on `egress_bwd`, but not on `ingress_fwd.valid`.
pub trait VrFsm<I, O> {
    /// Advances one cycle.
    fn step(&mut self, ingress_fwd: Valid<I>, egress_bwd: Ready) -> (Valid<O>, Ready);

    /// One-line description of the last cycle.
    fn line_trace(&self) -> String { String::new() }
}
