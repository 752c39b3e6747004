//! Implementation of proc macros on bit-packed signal types.
//!
//! # Note
//!
//! `#[derive(Signal)]` on a struct packs its fields MSB-first in declaration order: the first
//! field lands in the highest bits. The struct's width is the sum of its fields' widths.
//!
//! For example, the wire payload of a bias configuration message is as follows.
//!
//! ```ignore
//! #[derive(Debug, Clone, Copy, Signal)]
//! pub struct BiasConfig {
//!     output_idx: Bits<U<8>>,
//!     value: Fixed<U<22>>,
//! }
//!
//! // BiasConfig::WIDTH == 30
//! // transl() == (output_idx << 22) | (value & 0x3f_ffff)
//! ```
//!
//! On a unit-only enum, the encoding of each variant is its index unless overridden with
//! `#[encode(..)]`, and the width is `clog2(#variants)` unless overridden with `#[width(..)]`.
//! Every encoding of the width must be taken by some variant so that decoding is total.

mod signal;
mod utils;

use proc_macro::TokenStream;

#[proc_macro_derive(Signal, attributes(width, encode))]
pub fn signal(input: TokenStream) -> TokenStream { signal::derive(input) }
