//! Standard library: streaming components and the fully-connected layer accelerator.

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
#![allow(clippy::type_complexity)]
#![allow(elided_lifetimes_in_paths)]
#![allow(type_alias_bounds)]

use fcxcel::*;

mod config;
pub mod fc_layer;
pub mod fifo;
mod fsm;
pub mod harness;
pub mod pe;
pub mod reference;
pub mod valid_ready;

pub use config::*;
pub use fc_layer::FcLayer;
pub use fifo::Fifo;
pub use fsm::VrFsm;
pub use harness::{run_sim, split_msgs, SimError, SimStats, StreamSink, StreamSource};
pub use pe::*;
pub use reference::*;
pub use valid_ready::*;
