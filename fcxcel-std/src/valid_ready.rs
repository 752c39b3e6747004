//! Utilities for valid-ready channels.
//!
//! A valid-ready channel carries `Valid<V>` forward (producer to consumer) and `Ready` backward.
//! A transfer happens in a cycle if and only if both `valid` and `ready` are asserted in it.
//!
//! The adapters below wrap one cycle's worth of channel signals for a functional model. They keep
//! no state across cycles: a model builds them from the incoming signals at the start of a step,
//! calls `deq`/`enq` at most once, and hands the outgoing signals back at the end.

/// Valid/ready channel's forward signals.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Valid<V> {
    /// Inner data
    pub inner: V,

    /// Valid bit
    pub valid: bool,
}

/// Ready signal.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Ready {
    /// Ready bit
    pub ready: bool,
}

impl<V> Valid<V> {
    /// Creates a new forward signal.
    pub fn new(valid: bool, inner: V) -> Self { Self { inner, valid } }

    /// Creates a valid forward signal.
    pub fn valid(inner: V) -> Self { Self::new(true, inner) }

    /// Returns the inner value if valid.
    pub fn into_option(self) -> Option<V> { self.valid.then_some(self.inner) }

    /// Returns whether a transfer happens under the given backward signal.
    pub fn fire(&self, bwd: Ready) -> bool { self.valid && bwd.ready }
}

impl<V: Default> Valid<V> {
    /// Creates an invalid forward signal.
    pub fn invalid() -> Self { Self::new(false, V::default()) }
}

impl<V: Default> From<Option<V>> for Valid<V> {
    fn from(value: Option<V>) -> Self {
        match value {
            Some(inner) => Self::valid(inner),
            None => Self::invalid(),
        }
    }
}

impl Ready {
    /// Creates a new backward signal.
    pub fn new(ready: bool) -> Self { Self { ready } }
}

/// Consumer side of an ingress channel.
#[derive(Debug)]
pub struct IStreamDeqAdapter<V> {
    fwd: Valid<V>,
    ready: bool,
}

impl<V> IStreamDeqAdapter<V> {
    /// Wraps this cycle's forward signals.
    pub fn new(fwd: Valid<V>) -> Self { Self { fwd, ready: false } }

    /// Returns whether a message is offered this cycle.
    pub fn rdy(&self) -> bool { self.fwd.valid }

    /// Asserts `ready` and returns the offered message, if any.
    ///
    /// The message is transferred exactly when `Some` is returned.
    pub fn deq(&mut self) -> Option<V>
    where V: Clone {
        self.ready = true;
        self.fwd.valid.then(|| self.fwd.inner.clone())
    }

    /// Returns the backward signals for this cycle.
    pub fn into_bwd(self) -> Ready { Ready::new(self.ready) }
}

/// Producer side of an egress channel.
#[derive(Debug)]
pub struct OStreamEnqAdapter<V> {
    bwd: Ready,
    fwd: Option<V>,
}

impl<V: Default> OStreamEnqAdapter<V> {
    /// Wraps this cycle's backward signals.
    pub fn new(bwd: Ready) -> Self { Self { bwd, fwd: None } }

    /// Returns whether the consumer accepts a message this cycle.
    pub fn rdy(&self) -> bool { self.bwd.ready }

    /// Drives `value` with `valid` asserted.
    ///
    /// The message is transferred this cycle if and only if `rdy()` holds.
    pub fn enq(&mut self, value: V) {
        debug_assert!(self.fwd.is_none(), "at most one message can be sent per cycle");
        self.fwd = Some(value);
    }

    /// Returns the forward signals for this cycle.
    pub fn into_fwd(self) -> Valid<V> { self.fwd.into() }
}
