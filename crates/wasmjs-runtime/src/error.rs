//! Runtime error types.
//!
//! Two layers:
//!
//! - [`RuntimeError`]: failures reported to the embedding application
//!   (configuration, bootstrap, engine errors).
//! - [`BridgeError`]: recoverable failures of a single host import.  It is
//!   raised through the engine as a host error, which aborts the current
//!   export call only; the context stays usable.

use thiserror::Error;
use wasmjs_abi::AbiError;

/// Errors surfaced to the embedder.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// A script-level type error.
    #[error("TypeError: {0}")]
    Type(String),

    /// The execution engine rejected a module or trapped.
    #[error("engine error: {0}")]
    Engine(#[from] wasmi::Error),

    /// A required export or the argv block was missing or invalid at `run()`.
    #[error("bootstrap failed: {0}")]
    Bootstrap(String),

    /// The configuration file could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A script exception escaped to the embedder.
    #[error("uncaught exception: {0}")]
    Uncaught(String),

    #[error(transparent)]
    Abi(#[from] AbiError),
}

/// Runtime result type alias.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Recoverable failures of a host import.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A property operation targeted a value that is not an object.
    #[error("{op}: cannot access property {key:?} of {receiver}")]
    NotAnObject {
        op: &'static str,
        key: String,
        receiver: &'static str,
    },

    /// `valueLength` on null or undefined.
    #[error("valueLength: cannot read property \"length\" of {0}")]
    NoLength(&'static str),

    /// A string or byte operation received a value that is not a byte array.
    #[error("{0}: value is not a Uint8Array")]
    NotBytes(&'static str),

    /// A slot referenced an id the value table never assigned.
    #[error("unknown value id {0}")]
    UnknownValue(u32),

    /// A host import ran before `Go.run` attached the instance.
    #[error("bridge is not attached to a running instance")]
    NotRunning,

    /// The program already called `runtime.wasmExit`.
    #[error("Go program has already exited with code {0}")]
    Exited(i32),

    /// Script code threw; the thrown value is parked in the context.
    #[error("exception thrown: {0}")]
    Exception(String),

    #[error(transparent)]
    Memory(#[from] AbiError),
}

impl wasmi::core::HostError for BridgeError {}

impl From<BridgeError> for wasmi::Error {
    fn from(e: BridgeError) -> Self {
        wasmi::Error::host(e)
    }
}
