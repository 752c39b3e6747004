//! Type-level bit widths.
//!
//! Storage formats carry their width in the type, so the width growth of an operation is visible
//! in its signature: a `Fixed<U<16>>` times a `Fixed<U<12>>` is a `Fixed<Sum<U<16>, U<12>>>`.

use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;

/// Type-level width.
pub trait Num: Debug + Clone + Copy + PartialEq + Eq + Hash + Default + 'static {
    /// Width.
    const WIDTH: usize;
}

/// Usize number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct U<const N: usize>;

impl<const N: usize> Num for U<N> {
    const WIDTH: usize = N;
}

/// Sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Sum<L: Num, R: Num>(PhantomData<(L, R)>);

impl<L: Num, R: Num> Num for Sum<L, R> {
    const WIDTH: usize = L::WIDTH + R::WIDTH;
}

/// Max.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Max<L: Num, R: Num>(PhantomData<(L, R)>);

impl<L: Num, R: Num> Num for Max<L, R> {
    const WIDTH: usize = if L::WIDTH > R::WIDTH { L::WIDTH } else { R::WIDTH };
}
