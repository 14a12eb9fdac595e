//! WebAssembly JS-API object model and Go `js/wasm` host bridge on `wasmi`.
//!
//! # Architecture
//!
//! ```text
//! Context ── Store<HostState> ── Realm (globalThis, builtins)
//!    │                         ├─ BridgeState per `new Go()` (value table)
//!    │                         └─ stdio sink, pending exception
//!    └─ Scope: borrowed store view passed to every native function
//!
//! WebAssembly.{Module, Instance, Memory, Global, Table}   webassembly/
//! Go, importObject, host imports, bootstrap              bridge/
//! WASI fallback for instances without an import source  wasi
//! ```
//!
//! A typical embedding:
//!
//! ```no_run
//! use wasmjs_runtime::{Context, RuntimeConfig};
//!
//! let bytes = std::fs::read("main.wasm").unwrap();
//! let mut ctx = Context::new(RuntimeConfig::default());
//! let exit_code = ctx.run_go(&bytes).unwrap();
//! println!("exited with {exit_code:?}");
//! ```

pub mod bridge;
pub mod config;
pub mod context;
pub mod error;
pub mod script;
pub mod wasi;
pub mod webassembly;

pub use bridge::{BridgeId, BridgeState, GoBridge, GoImportObject, ValueTable};
pub use config::{RuntimeConfig, StdioMode};
pub use context::{Context, HostState, Scope};
pub use error::{BridgeError, RuntimeError, RuntimeResult};
pub use script::{ErrorKind, HostObject, JsResult, Object, Realm, Thrown, Value};
pub use webassembly::{WasmGlobal, WasmInstance, WasmMemory, WasmModule, WasmTable};
