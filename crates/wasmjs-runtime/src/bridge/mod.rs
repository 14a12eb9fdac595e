//! The Go `js/wasm` host bridge.
//!
//! # Architecture
//!
//! ```text
//! new Go()          -> BridgeState (value table, bridge object) + GoBridge
//! go.importObject   -> GoImportObject: host funcs bound to the bridge id
//! new Instance(...) -> linker with the funcs under `gojs` and `go`
//! go.run(instance)  -> bootstrap::run: attach exports, argv block, run()
//! ```
//!
//! Host functions must be `Send + Sync`, so they capture only a
//! [`BridgeId`]; the state they operate on lives in the store data and is
//! reached through the `Caller` on every call.

pub mod bootstrap;
mod frame;
mod go;
mod imports;
pub mod polyfill;
mod reflect;
mod syscall;
pub mod table;

use wasmi::{Memory, TypedFunc};

pub use frame::{Detached, Frame};
pub use go::{GoBridge, GoImportObject};
pub use table::ValueTable;

use crate::context::Scope;
use crate::script::{ErrorKind, JsResult, Object, Value};
use crate::webassembly::WasmInstance;

/// Index of a bridge in its context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BridgeId(u32);

impl BridgeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Host-side state of one bridge.
pub struct BridgeState {
    pub(crate) object: Object,
    pub(crate) table: ValueTable,
    pub(crate) memory: Option<Memory>,
    pub(crate) getsp: Option<TypedFunc<(), i32>>,
    pub(crate) resume: Option<TypedFunc<(), ()>>,
    pub(crate) exit_code: Option<i32>,
}

impl BridgeState {
    /// The state object the guest sees at id 6.
    pub fn object(&self) -> &Object {
        &self.object
    }

    pub fn table(&self) -> &ValueTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut ValueTable {
        &mut self.table
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    pub fn is_attached(&self) -> bool {
        self.memory.is_some()
    }
}

/// Allocate a bridge and its state object.
pub(crate) fn create(scope: &mut Scope<'_>) -> BridgeId {
    let realm = scope.realm();
    let id = BridgeId(scope.state().bridges.len() as u32);

    let object = realm.new_object();
    object.set_own("_pendingEvent", Value::Null);
    object.set_own(
        "_makeFuncWrapper",
        realm.new_function("_makeFuncWrapper", move |scope, _, args| {
            let func_id = args.first().cloned().unwrap_or_default();
            Ok(func_wrapper(scope, id, func_id).into())
        }),
    );

    let table = ValueTable::new(realm.global().clone(), object.clone());
    scope.state_mut().bridges.push(BridgeState {
        object,
        table,
        memory: None,
        getsp: None,
        resume: None,
        exit_code: None,
    });
    id
}

/// A script function that delivers its invocation to the guest callback
/// `func_id` as a pending event and returns the event's result.
fn func_wrapper(scope: &Scope<'_>, bridge: BridgeId, func_id: Value) -> Object {
    scope.realm().new_function("", move |scope, this, args| {
        let state_object = match scope.state().bridge(bridge) {
            Ok(state) if state.exit_code.is_none() => state.object.clone(),
            _ => return Err(scope.error(ErrorKind::Error, "Go program has already exited")),
        };
        let realm = scope.realm();
        let event = realm.new_object();
        event.set_own("id", func_id.clone());
        event.set_own("this", this.clone());
        event.set_own("args", realm.new_array(args.to_vec()));
        state_object.set_own("_pendingEvent", event.clone());
        resume(scope, bridge)?;
        Ok(event.get_own("result"))
    })
}

/// Drive the guest's `resume` export until it parks again.
pub(crate) fn resume(scope: &mut Scope<'_>, bridge: BridgeId) -> JsResult<()> {
    let resume = match scope.state().bridge(bridge).ok().and_then(|b| b.resume) {
        Some(f) => f,
        None => return Err(scope.type_error("Go: program is not running")),
    };
    match resume.call(scope.store_mut(), ()) {
        Ok(()) => Ok(()),
        Err(e) if e.i32_exit_status().is_some() => Ok(()),
        Err(e) => Err(scope.engine_error("Go: resume", e)),
    }
}

/// Install the `Go` constructor.
pub(crate) fn install(scope: &mut Scope<'_>) {
    let realm = scope.realm();
    let proto = scope.prototypes().go.clone();

    proto.set_own("run", realm.new_function("run", go_run));

    let ctor_proto = proto.clone();
    let ctor = realm.new_constructor("Go", &proto, move |scope, _, _| {
        let id = create(scope);
        Ok(scope.realm().new_host(GoBridge::new(id), &ctor_proto).into())
    });
    realm.global().set_own("Go", ctor);
}

/// `Go.prototype.run(instance)`.
fn go_run(scope: &mut Scope<'_>, this: &Value, args: &[Value]) -> JsResult<Value> {
    let Some(go) = this.as_object().and_then(Object::host::<GoBridge>) else {
        return Err(scope.type_error("Go.run: receiver is not a Go instance"));
    };
    let Some(instance) = args
        .first()
        .and_then(Value::as_object)
        .and_then(Object::host::<WasmInstance>)
    else {
        return Err(scope.type_error("Go.run: argument 1 must be a WebAssembly.Instance"));
    };

    let extra_args = go.extra_args();
    match bootstrap::run(scope, go.id(), &instance.native(), &extra_args) {
        Ok(_) => Ok(Value::Undefined),
        Err(crate::error::RuntimeError::Engine(e)) => Err(scope.engine_error("Go.run", e)),
        Err(e) => Err(scope.type_error(format!("Go.run: {e}"))),
    }
}
