//! Two's-complement fixed-point arithmetic.
//!
//! A [`Fixed<N>`] holds an `N`-bit two's-complement integer. Where the binary point sits is not
//! part of the type: it is a property of how a value is produced and consumed, described by a
//! [`QFormat`] and applied through [`Fixed::rescale`].
//!
//! Every operation follows the hardware datapath exactly:
//!
//! - multiplication sign-extends both operands and produces a result as wide as both inputs
//!   together, so it is always exact;
//! - rescaling is an arithmetic right shift, which rounds towards negative infinity, optionally
//!   preceded by adding half an output LSB to round to nearest;
//! - accumulation adds at a common width and keeps the low-order bits of the storage width. It
//!   wraps on overflow and never saturates.

use std::fmt;
use std::marker::PhantomData;
use std::ops::Add;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::*;

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FixedError {
    #[error("value {value} does not fit in a {width}-bit two's-complement field")]
    OutOfRange { value: i64, width: usize },
}

/// Fixed-point format with a sign bit, `int_bits` integer bits and `frac_bits` fraction bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QFormat {
    /// Integer bits, excluding the sign bit.
    pub int_bits: u32,

    /// Fraction bits.
    pub frac_bits: u32,
}

impl QFormat {
    /// Q4.7: 1 sign, 4 integer and 7 fraction bits.
    pub const Q4_7: QFormat = QFormat { int_bits: 4, frac_bits: 7 };

    /// Total width including the sign bit.
    pub const fn width(self) -> usize { 1 + self.int_bits as usize + self.frac_bits as usize }
}

/// How a right shift disposes of the bits it drops.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rounding {
    /// Towards negative infinity: a plain arithmetic shift.
    #[default]
    Floor,

    /// To nearest, ties towards positive infinity: add half an output LSB, then shift.
    HalfUp,
}

/// Replicates the sign bit of the `from`-bit value `bits` into bits `from..to`.
///
/// Bits of the result at or above `to` are zero.
pub fn sign_extend(bits: u64, from: usize, to: usize) -> u64 {
    debug_assert!(from <= to, "sign extension cannot narrow a value ({} -> {})", from, to);
    (sext(bits, from) as u64) & mask(to)
}

/// `N`-bit two's-complement value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Fixed<N: Num> {
    raw: i64,
    _marker: PhantomData<N>,
}

impl<N: Num> Fixed<N> {
    /// Smallest representable raw value.
    pub const MIN: i64 = -(1 << (N::WIDTH - 1));

    /// Largest representable raw value.
    pub const MAX: i64 = (1 << (N::WIDTH - 1)) - 1;

    /// Creates a value from a raw integer, keeping its low `N` bits.
    pub fn new(raw: i64) -> Self { Self { raw: sext(raw as u64, N::WIDTH), _marker: PhantomData } }

    /// Creates a value from a raw integer, failing if it needs more than `N` bits.
    pub fn checked(raw: i64) -> Result<Self, FixedError> {
        if (Self::MIN..=Self::MAX).contains(&raw) {
            Ok(Self::new(raw))
        } else {
            Err(FixedError::OutOfRange { value: raw, width: N::WIDTH })
        }
    }

    /// Zero.
    pub fn zero() -> Self { Self::new(0) }

    /// Returns the raw two's-complement integer.
    pub fn raw(self) -> i64 { self.raw }

    /// Reinterprets the value at width `M`.
    ///
    /// Widening sign-extends. Narrowing keeps the low `M` bits.
    pub fn resize<M: Num>(self) -> Fixed<M> { Fixed::new(self.raw) }

    /// Sign-extends the value to width `M`.
    pub fn sext<M: Num>(self) -> Fixed<M> {
        debug_assert!(M::WIDTH >= N::WIDTH, "sign extension cannot narrow a value ({} -> {})", N::WIDTH, M::WIDTH);
        self.resize()
    }

    /// Full-width product. The result is exact.
    pub fn mul<M: Num>(self, rhs: Fixed<M>) -> Fixed<Sum<N, M>> { Fixed::new(self.raw.wrapping_mul(rhs.raw)) }

    /// Arithmetic right shift by `shift` bits, realigning the binary point after a multiply.
    pub fn rescale(self, shift: u32) -> Self { Self::new(self.raw >> shift.min(63)) }

    /// Like [`Fixed::rescale`], but rounds to nearest with ties going up.
    ///
    /// The half LSB is added before the shift at full precision, then the result wraps to `N` bits.
    pub fn rescale_round(self, shift: u32) -> Self {
        let shift = shift.min(63);
        let half = if shift == 0 { 0 } else { 1i64 << (shift - 1) };
        Self::new(self.raw.wrapping_add(half) >> shift)
    }

    /// Rescales with the given rounding.
    pub fn rescale_with(self, shift: u32, rounding: Rounding) -> Self {
        match rounding {
            Rounding::Floor => self.rescale(shift),
            Rounding::HalfUp => self.rescale_round(shift),
        }
    }

    /// Adds `term` into `self`, wrapping to `N` bits.
    pub fn accumulate<M: Num>(self, term: Fixed<M>) -> Self {
        let lhs = self.sext::<Max<N, M>>();
        let rhs = term.sext::<Max<N, M>>();
        Self::new(lhs.raw.wrapping_add(rhs.raw))
    }

    /// Quantizes a real number with `frac_bits` fraction bits.
    ///
    /// Rounds to nearest and saturates at the representable extremes.
    pub fn from_f32(value: f32, frac_bits: u32) -> Self {
        let scaled = (f64::from(value) * (1u64 << frac_bits) as f64).round();
        let raw = scaled.clamp(Self::MIN as f64, Self::MAX as f64) as i64;
        Self::new(raw)
    }

    /// Converts back to a real number, assuming `frac_bits` fraction bits.
    pub fn to_f32(self, frac_bits: u32) -> f32 { (self.raw as f64 / (1u64 << frac_bits) as f64) as f32 }
}

impl<N: Num> Add for Fixed<N> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self { self.accumulate(rhs) }
}

impl<N: Num> fmt::Debug for Fixed<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Fixed<{}>({})", N::WIDTH, self.raw) }
}

impl<N: Num> fmt::Display for Fixed<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.raw) }
}

impl<N: Num> Signal for Fixed<N> {
    const WIDTH: usize = N::WIDTH;

    fn transl(self) -> u64 { self.raw as u64 & mask(N::WIDTH) }

    fn from_bits(bits: u64) -> Self { Self { raw: sext(bits, N::WIDTH), _marker: PhantomData } }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Q12 = Fixed<U<12>>;
    type I16 = Fixed<U<16>>;
    type A18 = Fixed<U<18>>;

    #[test]
    fn new_wraps_to_width() {
        assert_eq!(Q12::new(2047).raw(), 2047);
        assert_eq!(Q12::new(2048).raw(), -2048);
        assert_eq!(Q12::new(-2049).raw(), 2047);
        assert_eq!(Q12::new(0xfff).raw(), -1);
        assert_eq!(Q12::MIN, -2048);
        assert_eq!(Q12::MAX, 2047);
    }

    #[test]
    fn checked_rejects_values_outside_the_field() {
        assert!(Q12::checked(-2048).is_ok());
        assert_eq!(Q12::checked(2048), Err(FixedError::OutOfRange { value: 2048, width: 12 }));
    }

    #[test]
    fn multiply_widens_and_is_exact() {
        let a = I16::new(I16::MIN);
        let b = Q12::new(Q12::MIN);
        let p = a.mul(b);
        assert_eq!(<Fixed<Sum<U<16>, U<12>>> as Signal>::WIDTH, 28);
        assert_eq!(p.raw(), 32768 * 2048);

        assert_eq!(I16::new(-3).mul(Q12::new(5)).raw(), -15);
    }

    #[test]
    fn q4_7_product_rescales_by_fraction_bits() {
        // 2.5 * -1.75 = -4.375
        let a = Q12::from_f32(2.5, 7);
        let b = Q12::from_f32(-1.75, 7);
        assert_eq!(a.raw(), 320);
        assert_eq!(b.raw(), -224);
        let p = a.mul(b).rescale(7);
        assert_eq!(p.raw(), -560);
        assert_eq!(p.to_f32(7), -4.375);
    }

    #[test]
    fn rescale_rounds_towards_negative_infinity() {
        assert_eq!(I16::new(-1).rescale(7).raw(), -1);
        assert_eq!(I16::new(255).rescale(7).raw(), 1);
        assert_eq!(I16::new(-129).rescale(7).raw(), -2);
        assert_eq!(I16::new(100).rescale(0).raw(), 100);
    }

    #[test]
    fn accumulate_wraps_instead_of_saturating() {
        let sum = A18::new(A18::MAX);
        assert_eq!(sum.accumulate(Q12::new(1)).raw(), A18::MIN);
        assert_eq!((A18::new(A18::MIN) + A18::new(-1)).raw(), A18::MAX);

        // A wider term is added at the common width, then truncated.
        let term = Fixed::<U<28>>::new(1 << 18);
        assert_eq!(A18::new(5).accumulate(term).raw(), 5);
    }

    #[test]
    fn sign_extension() {
        assert_eq!(sign_extend(0xfff, 12, 18), 0x3ffff);
        assert_eq!(sign_extend(0x7ff, 12, 18), 0x7ff);
        assert_eq!(Q12::new(-5).sext::<U<18>>().raw(), -5);
        assert_eq!(Q12::new(-5).sext::<U<18>>().transl(), 0x3fffb);
    }

    #[test]
    fn from_f32_saturates() {
        assert_eq!(Q12::from_f32(100.0, 7).raw(), Q12::MAX);
        assert_eq!(Q12::from_f32(-100.0, 7).raw(), Q12::MIN);
        assert_eq!(Q12::from_f32(0.00390625, 7).raw(), 1);
    }

    #[test]
    fn q_format() {
        assert_eq!(QFormat::Q4_7.width(), 12);
        assert_eq!(QFormat { int_bits: 8, frac_bits: 7 }.width(), 16);
    }

    #[test]
    fn rescale_round_ties_go_up() {
        type P28 = Fixed<U<28>>;
        // Half an LSB of a Q4.7 product.
        assert_eq!(P28::new(64).rescale(7).raw(), 0);
        assert_eq!(P28::new(64).rescale_round(7).raw(), 1);
        assert_eq!(P28::new(63).rescale_round(7).raw(), 0);
        assert_eq!(P28::new(-64).rescale_round(7).raw(), 0);
        assert_eq!(P28::new(-65).rescale_round(7).raw(), -1);
        assert_eq!(P28::new(191).rescale_round(7).raw(), 1);
        assert_eq!(P28::new(192).rescale_round(7).raw(), 2);
        assert_eq!(P28::new(-5).rescale_round(0).raw(), -5);

        let p = Q12::new(64).mul(Q12::new(-13));
        assert_eq!(p.rescale_with(7, Rounding::Floor).raw(), -7);
        assert_eq!(p.rescale_with(7, Rounding::HalfUp).raw(), -6);
        assert_eq!(Rounding::default(), Rounding::Floor);
    }
}
