//! fcxcel: bit-accurate building blocks for a streaming fully-connected layer accelerator.
//!
//! This crate holds the leaf components: type-level bit widths, the bit-packed [`Signal`] trait,
//! two's-complement fixed-point arithmetic with explicit width growth, and the 32-bit tagged
//! message codec spoken on the accelerator's streams.

// # Tries to deny all lints (`rustc -W help`).
#![deny(absolute_paths_not_starting_with_crate)]
#![deny(anonymous_parameters)]
#![deny(deprecated_in_future)]
#![deny(explicit_outlives_requirements)]
#![deny(keyword_idents)]
#![deny(macro_use_extern_crate)]
#![deny(missing_debug_implementations)]
#![deny(non_ascii_idents)]
#![deny(rust_2018_idioms)]
#![deny(trivial_numeric_casts)]
#![deny(unsafe_op_in_unsafe_fn)]
#![deny(unused_extern_crates)]
#![deny(unused_import_braces)]
#![deny(variant_size_differences)]
//
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::missing_crate_level_docs)]
#![deny(rustdoc::invalid_codeblock_attributes)]
#![deny(rustdoc::invalid_html_tags)]
#![deny(rustdoc::invalid_rust_codeblocks)]
#![deny(rustdoc::bare_urls)]
#![deny(unreachable_pub)]
//
#![allow(clippy::needless_lifetimes)]
#![allow(elided_lifetimes_in_paths)]
#![allow(type_alias_bounds)]

#[macro_use]
pub mod utils;
pub mod fixed;
pub mod message;
pub mod num;
mod signal;

pub use fcxcel_macro::Signal;
pub use fixed::*;
pub use message::*;
pub use num::*;
pub use signal::*;
pub use utils::*;
