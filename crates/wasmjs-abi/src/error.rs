//! ABI error types.

use thiserror::Error;

/// Errors raised while reading or writing the bridge's linear-memory layout.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    /// An access fell outside the current linear-memory buffer.
    #[error("memory access out of bounds: {len} bytes at {addr:#x} (memory size {size})")]
    OutOfBounds { addr: u64, len: u64, size: usize },

    /// The argv/env block does not fit below the bootstrap limit.
    #[error("total length of command line and environment variables exceeds limit ({end} > {limit})")]
    ArgvTooLarge { end: u64, limit: u32 },

    /// A string passed to the bootstrap block contains an interior NUL.
    #[error("argument contains a NUL byte: {0:?}")]
    InteriorNul(String),
}

/// ABI result type alias.
pub type AbiResult<T> = Result<T, AbiError>;
