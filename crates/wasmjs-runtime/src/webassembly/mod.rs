//! The `WebAssembly` object model on top of `wasmi`.
//!
//! | Constructor | Backing type |
//! |-------------|--------------|
//! | `WebAssembly.Module(bytes)` | [`WasmModule`] |
//! | `WebAssembly.Instance(module, importSource?)` | [`WasmInstance`] |
//! | `WebAssembly.Memory({initial, maximum?})` | [`WasmMemory`] |
//! | `WebAssembly.Global({value, mutable?}, init?)` | [`WasmGlobal`] |
//! | `WebAssembly.Table({element, initial, maximum?})` | [`WasmTable`] |
//!
//! Exported memories, globals and tables are reflected through the same
//! constructors, then bound to their native handle.

mod exports;
pub mod global;
pub mod instance;
pub mod memory;
pub mod module;
pub mod numeric;
pub mod table;

pub use exports::InstanceExports;
pub use global::WasmGlobal;
pub use instance::WasmInstance;
pub use memory::WasmMemory;
pub use module::{ExportDescriptor, ExternKind, ImportDescriptor, WasmModule};
pub use numeric::NumericKind;
pub use table::WasmTable;

use crate::context::Scope;

/// Install `globalThis.WebAssembly`.
pub(crate) fn install(scope: &mut Scope<'_>) {
    let realm = scope.realm();
    let protos = scope.prototypes();
    let namespace = realm.new_object();

    let module_ctor = realm.new_constructor("Module", &protos.module, module::construct);
    module_ctor.set_own("exports", realm.new_function("exports", module::exports));
    module_ctor.set_own("imports", realm.new_function("imports", module::imports));
    namespace.set_own("Module", module_ctor);

    namespace.set_own(
        "Instance",
        realm.new_constructor("Instance", &protos.instance, instance::construct),
    );

    protos.memory.set_own("grow", realm.new_function("grow", memory::grow));
    namespace.set_own(
        "Memory",
        realm.new_constructor("Memory", &protos.memory, memory::construct),
    );

    protos.global.set_own("valueOf", realm.new_function("valueOf", global::value_of));
    namespace.set_own(
        "Global",
        realm.new_constructor("Global", &protos.global, global::construct),
    );

    namespace.set_own(
        "Table",
        realm.new_constructor("Table", &protos.table, table::construct),
    );

    realm.global().set_own("WebAssembly", namespace);
}
