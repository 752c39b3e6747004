use std::fmt;
use std::fmt::Debug;
use std::marker::PhantomData;

use crate::*;

/// Bit-representable values.
///
/// A signal occupies the lowest `WIDTH` bits of a `u64`. Composite signals derived with
/// `#[derive(Signal)]` pack their members MSB-first in declaration order.
pub trait Signal: 'static + Debug + Clone {
    /// Signal's bit width.
    ///
    /// # Note
    ///
    /// `Self::WIDTH` should be at most 64, and `transl()` should never set a bit at or above it.
    const WIDTH: usize;

    /// Translates the value into its bit representation.
    fn transl(self) -> u64;

    /// Reads the value back from the lowest `WIDTH` bits of `bits`. Higher bits are ignored.
    fn from_bits(bits: u64) -> Self;
}

impl Signal for () {
    const WIDTH: usize = 0;

    fn transl(self) -> u64 { 0 }

    fn from_bits(_bits: u64) -> Self {}
}

impl Signal for bool {
    const WIDTH: usize = 1;

    fn transl(self) -> u64 { u64::from(self) }

    fn from_bits(bits: u64) -> Self { bits & 1 != 0 }
}

macro_rules! impl_signal {
    ($typ:ty) => {
        impl Signal for $typ {
            const WIDTH: usize = ::std::mem::size_of::<$typ>() * 8;

            #[allow(trivial_numeric_casts)]
            fn transl(self) -> u64 { self as u64 }

            #[allow(trivial_numeric_casts)]
            fn from_bits(bits: u64) -> Self { (bits & mask(Self::WIDTH)) as $typ }
        }
    };
}

impl_signal!(u8);
impl_signal!(u16);
impl_signal!(u32);
impl_signal!(u64);

/// Unsigned `N`-bit value.
///
/// Construction keeps the lowest `N` bits, as a hardware wire of that width would.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Bits<N: Num> {
    inner: u64,
    _marker: PhantomData<N>,
}

impl<N: Num> Bits<N> {
    /// Largest representable value.
    pub const MAX: u64 = mask(N::WIDTH);

    /// Creates a new value, truncated to `N` bits.
    pub fn new(value: u64) -> Self { Self { inner: value & mask(N::WIDTH), _marker: PhantomData } }

    /// Returns the value.
    pub fn value(self) -> u64 { self.inner }

    /// Returns the value as an index.
    pub fn index(self) -> usize { self.inner as usize }
}

impl<N: Num> From<usize> for Bits<N> {
    fn from(value: usize) -> Self { Self::new(value as u64) }
}

impl<N: Num> Debug for Bits<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Bits<{}>({})", N::WIDTH, self.inner) }
}

impl<N: Num> fmt::Display for Bits<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.inner) }
}

impl<N: Num> Signal for Bits<N> {
    const WIDTH: usize = N::WIDTH;

    fn transl(self) -> u64 { self.inner }

    fn from_bits(bits: u64) -> Self { Self::new(bits) }
}
