//! The embedded script object model.
//!
//! A small value/object system: enough of the script
//! environment for compiled modules to exchange values with the host
//! (property access, calls, construction, byte buffers, errors) without
//! pulling in a full script engine.

pub mod date;
pub mod host;
pub mod object;
pub mod realm;
pub mod value;

pub use date::DateObject;
pub use host::HostObject;
pub use object::{
    ArrayBuffer, ByteStore, Function, NativeFn, Object, ObjectKind, Uint8Array, MAX_BYTE_LENGTH,
    MAX_DENSE_LENGTH,
};
pub use realm::{ErrorKind, Realm};
pub use value::{format_number, JsResult, Thrown, Value};
