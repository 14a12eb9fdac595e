//! The execution context: one engine, one store, one realm.
//!
//! [`Context`] replaces any process-wide engine handle.  Everything the
//! host side needs at runtime lives in the store data ([`HostState`]) so
//! that host imports, which only receive a `Caller`, can reach it.
//! [`Scope`] is the borrowed view handed to native script functions.

use std::io::Write;
use std::time::Instant;

use wasmi::{AsContextMut, Engine, Store, StoreContextMut};

use crate::bridge::{BridgeId, BridgeState};
use crate::config::{RuntimeConfig, StdioMode};
use crate::error::{BridgeError, RuntimeError, RuntimeResult};
use crate::script::{ErrorKind, JsResult, Object, Realm, Thrown, Value};

/// Prototypes of the host-backed classes, shared by the constructors and
/// by export reflection.
pub(crate) struct Prototypes {
    pub module: Object,
    pub instance: Object,
    pub exports: Object,
    pub memory: Object,
    pub global: Object,
    pub table: Object,
    pub go: Object,
    pub import_object: Object,
}

impl Prototypes {
    fn new(realm: &Realm) -> Self {
        Self {
            module: realm.new_object(),
            instance: realm.new_object(),
            exports: realm.new_object(),
            memory: realm.new_object(),
            global: realm.new_object(),
            table: realm.new_object(),
            go: realm.new_object(),
            import_object: realm.new_object(),
        }
    }
}

/// Destination of fd 1 and fd 2.
pub(crate) struct Stdio {
    mode: StdioMode,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

impl Stdio {
    fn new(mode: StdioMode) -> Self {
        Self {
            mode,
            stdout: Vec::new(),
            stderr: Vec::new(),
        }
    }

    /// Write to fd 1 or 2; returns `false` for any other descriptor.
    pub fn write(&mut self, fd: i64, bytes: &[u8]) -> bool {
        let result = match (self.mode, fd) {
            (StdioMode::Capture, 1) => {
                self.stdout.extend_from_slice(bytes);
                Ok(())
            }
            (StdioMode::Capture, 2) => {
                self.stderr.extend_from_slice(bytes);
                Ok(())
            }
            (StdioMode::Inherit, 1) => std::io::stdout().write_all(bytes),
            (StdioMode::Inherit, 2) => std::io::stderr().write_all(bytes),
            _ => {
                tracing::warn!(fd, len = bytes.len(), "write to unsupported file descriptor ignored");
                return false;
            }
        };
        if let Err(e) = result {
            tracing::warn!(fd, error = %e, "stdio write failed");
        }
        true
    }

    pub fn flush(&self) {
        if self.mode == StdioMode::Inherit {
            let _ = std::io::stdout().flush();
            let _ = std::io::stderr().flush();
        }
    }
}

/// Store data of a [`Context`].
pub struct HostState {
    realm: Realm,
    config: RuntimeConfig,
    pub(crate) prototypes: Prototypes,
    pub(crate) bridges: Vec<BridgeState>,
    pub(crate) stdio: Stdio,
    started: Instant,
    pending_exception: Option<Value>,
}

impl HostState {
    pub fn realm(&self) -> &Realm {
        &self.realm
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Time since the context was created; the origin of `nanotime1`.
    pub fn uptime(&self) -> std::time::Duration {
        self.started.elapsed()
    }

    pub(crate) fn bridge(&self, id: BridgeId) -> Result<&BridgeState, BridgeError> {
        self.bridges.get(id.index()).ok_or(BridgeError::NotRunning)
    }

    pub(crate) fn bridge_mut(&mut self, id: BridgeId) -> Result<&mut BridgeState, BridgeError> {
        self.bridges.get_mut(id.index()).ok_or(BridgeError::NotRunning)
    }
}

/// An engine, a store and the script realm living in it.
pub struct Context {
    store: Store<HostState>,
}

impl Context {
    pub fn new(config: RuntimeConfig) -> Self {
        Self::with_engine(&Engine::default(), config)
    }

    pub fn with_engine(engine: &Engine, config: RuntimeConfig) -> Self {
        let realm = Realm::new();
        let state = HostState {
            prototypes: Prototypes::new(&realm),
            stdio: Stdio::new(config.stdio),
            realm,
            config,
            bridges: Vec::new(),
            started: Instant::now(),
            pending_exception: None,
        };
        let mut ctx = Self {
            store: Store::new(engine, state),
        };
        {
            let mut scope = ctx.scope();
            crate::webassembly::install(&mut scope);
            crate::bridge::install(&mut scope);
            crate::bridge::polyfill::install(&mut scope);
        }
        ctx
    }

    pub fn scope(&mut self) -> Scope<'_> {
        Scope::new(self.store.as_context_mut())
    }

    pub fn realm(&self) -> &Realm {
        self.store.data().realm()
    }

    pub fn global(&self) -> Object {
        self.realm().global().clone()
    }

    pub fn config(&self) -> &RuntimeConfig {
        self.store.data().config()
    }

    pub fn engine(&self) -> &Engine {
        self.store.engine()
    }

    pub fn store(&self) -> &Store<HostState> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store<HostState> {
        &mut self.store
    }

    /// State of a bridge created by `new Go()`.
    pub fn bridge(&self, id: BridgeId) -> Option<&BridgeState> {
        self.store.data().bridges.get(id.index())
    }

    pub fn bridge_mut(&mut self, id: BridgeId) -> Option<&mut BridgeState> {
        self.store.data_mut().bridges.get_mut(id.index())
    }

    /// Drain captured fd 1 output.
    pub fn take_stdout(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.store.data_mut().stdio.stdout)
    }

    /// Drain captured fd 2 output.
    pub fn take_stderr(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.store.data_mut().stdio.stderr)
    }

    /// Compile `bytes`, instantiate it against a fresh `Go` bridge and run
    /// it to completion.  Returns the exit code if the program exited.
    pub fn run_go(&mut self, bytes: &[u8]) -> RuntimeResult<Option<i32>> {
        let mut scope = self.scope();
        let outcome = run_go_in(&mut scope, bytes);
        outcome.map_err(|thrown| RuntimeError::Uncaught(thrown.value().to_display_string()))
    }
}

fn run_go_in(scope: &mut Scope<'_>, bytes: &[u8]) -> JsResult<Option<i32>> {
    let global: Value = scope.global().into();
    let namespace = scope.get(&global, "WebAssembly")?;
    let module_ctor = scope.get(&namespace, "Module")?;
    let instance_ctor = scope.get(&namespace, "Instance")?;
    let go_ctor = scope.get(&global, "Go")?;

    let source = scope.realm().new_uint8_array(bytes.to_vec());
    let module = scope.construct(&module_ctor, &[source.into()])?;
    let go = scope.construct(&go_ctor, &[])?;
    let import_object = scope.get(&go, "importObject")?;
    let instance = scope.construct(&instance_ctor, &[module, import_object])?;
    scope.call_method(&go, "run", &[instance])?;

    let exit_code = scope.get(&go, "exitCode")?;
    Ok(exit_code.as_number().map(|n| n as i32))
}

impl Default for Context {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

/// Borrowed access to the store, handed to every native function.
pub struct Scope<'a> {
    store: StoreContextMut<'a, HostState>,
}

impl<'a> Scope<'a> {
    pub fn new(store: StoreContextMut<'a, HostState>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &StoreContextMut<'a, HostState> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut StoreContextMut<'a, HostState> {
        &mut self.store
    }

    pub fn state(&self) -> &HostState {
        self.store.data()
    }

    pub fn state_mut(&mut self) -> &mut HostState {
        self.store.data_mut()
    }

    pub fn realm(&self) -> Realm {
        self.state().realm.clone()
    }

    pub fn global(&self) -> Object {
        self.state().realm.global().clone()
    }

    pub(crate) fn prototypes(&self) -> &Prototypes {
        &self.state().prototypes
    }

    pub fn error(&self, kind: ErrorKind, message: impl Into<String>) -> Thrown {
        self.state().realm.throw(kind, message)
    }

    pub fn type_error(&self, message: impl Into<String>) -> Thrown {
        self.error(ErrorKind::TypeError, message)
    }

    pub fn range_error(&self, message: impl Into<String>) -> Thrown {
        self.error(ErrorKind::RangeError, message)
    }

    /// Property read on any value, with primitive coercion.
    pub fn get(&mut self, target: &Value, key: &str) -> JsResult<Value> {
        match target {
            Value::Object(o) => o.get(self, key),
            Value::Undefined | Value::Null => Err(self.type_error(format!(
                "Cannot read properties of {target} (reading '{key}')"
            ))),
            Value::String(s) if key == "length" => {
                Ok(Value::Integer(s.encode_utf16().count() as i64))
            }
            _ => Ok(Value::Undefined),
        }
    }

    /// Property write on any value; writes to primitives are dropped.
    pub fn set(&mut self, target: &Value, key: &str, value: Value) -> JsResult<()> {
        match target {
            Value::Object(o) => o.set(self, key, value),
            Value::Undefined | Value::Null => Err(self.type_error(format!(
                "Cannot set properties of {target} (setting '{key}')"
            ))),
            _ => Ok(()),
        }
    }

    pub fn call(&mut self, callee: &Value, this: &Value, args: &[Value]) -> JsResult<Value> {
        let f = match callee.as_object().and_then(Object::as_function) {
            Some(f) => f.callable(),
            None => {
                return Err(self.type_error(format!("{} is not a function", callee.type_of())))
            }
        };
        f(self, this, args)
    }

    /// `receiver[name](...args)`.
    pub fn call_method(&mut self, receiver: &Value, name: &str, args: &[Value]) -> JsResult<Value> {
        let method = self.get(receiver, name)?;
        if !method.is_callable() {
            return Err(self.type_error(format!(
                "{}.{name} is not a function",
                receiver.as_object().map_or("value", Object::class_name)
            )));
        }
        self.call(&method, receiver, args)
    }

    /// `new ctor(...args)`.
    pub fn construct(&mut self, ctor: &Value, args: &[Value]) -> JsResult<Value> {
        let Some(ctor_obj) = ctor.as_object() else {
            return Err(self.type_error(format!("{} is not a constructor", ctor.type_of())));
        };
        let f = match ctor_obj.as_function() {
            Some(f) if f.is_constructor() => f.callable(),
            _ => return Err(self.type_error(format!("{} is not a constructor", ctor_obj.class_name()))),
        };
        let prototype = match ctor_obj.get_own("prototype") {
            Value::Object(p) => p,
            _ => self.state().realm.object_prototype().clone(),
        };
        let this = Object::new(crate::script::ObjectKind::Ordinary, Some(prototype));
        match f(self, &Value::Object(this.clone()), args)? {
            result @ Value::Object(_) => Ok(result),
            _ => Ok(Value::Object(this)),
        }
    }

    /// `value instanceof ctor`.
    pub fn instance_of(&mut self, value: &Value, ctor: &Value) -> JsResult<bool> {
        if !ctor.is_callable() {
            return Err(self.type_error("Right-hand side of 'instanceof' is not callable"));
        }
        let Value::Object(prototype) = self.get(ctor, "prototype")? else {
            return Err(self.type_error("Function has non-object prototype in instanceof check"));
        };
        let Value::Object(obj) = value else {
            return Ok(false);
        };
        let mut current = obj.prototype();
        while let Some(p) = current {
            if p.ptr_eq(&prototype) {
                return Ok(true);
            }
            current = p.prototype();
        }
        Ok(false)
    }

    /// Park a script exception so it can cross the engine as a host error.
    pub(crate) fn park_exception(&mut self, thrown: Thrown) -> BridgeError {
        let message = thrown.message();
        self.state_mut().pending_exception = Some(thrown.0);
        BridgeError::Exception(message)
    }

    /// Script-facing form of an engine failure: a parked exception is
    /// rethrown as is, anything else becomes `TypeError("<context>: ...")`.
    pub(crate) fn engine_error(&mut self, context: &str, err: wasmi::Error) -> Thrown {
        if let Some(BridgeError::Exception(_)) = err.downcast_ref::<BridgeError>() {
            if let Some(value) = self.state_mut().pending_exception.take() {
                return Thrown(value);
            }
        }
        self.type_error(format!("{context}: {err}"))
    }
}
