//! Go `js/wasm` bridge ABI: the binary contract between a compiled module and
//! its host.
//!
//! # Architecture
//!
//! A module built for the script-hosted target talks to its host through a
//! single calling convention: every host import receives one argument, the
//! module's stack pointer `sp`, and reads its arguments from / writes its
//! results to fixed offsets above that address.  Values crossing the
//! boundary are 8-byte *slots*:
//!
//! ```text
//! finite non-zero f64   : raw IEEE-754 bits
//! undefined             : 0x0000_0000_0000_0000
//! reference / NaN / 0   : [NAN_HEAD | flag : u32][id : u32]
//! ```
//!
//! This crate holds the engine-independent half of that contract:
//!
//! - [`layout`]: reserved value ids, import/export names, bootstrap offsets
//!   and the argv/env block writer.
//! - [`slot`]: the slot codec.
//! - [`memory`]: bounds-checked typed views over a linear-memory buffer.
//!
//! Nothing here owns a memory or a value table; the runtime crate re-fetches
//! the buffer for every host call and hands a fresh view to these helpers.

pub mod error;
pub mod layout;
pub mod memory;
pub mod slot;

pub use error::{AbiError, AbiResult};
pub use layout::{write_argv_block, ArgvBlock};
pub use memory::{MemoryView, MemoryViewMut};
pub use slot::{Slot, TypeFlag};
