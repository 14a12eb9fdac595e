//! `WebAssembly.Global`.

use std::any::Any;
use std::cell::{OnceCell, RefCell};

use wasmi::{Mutability, Val};

use super::numeric::{to_value, NumericKind};
use crate::context::Scope;
use crate::script::{HostObject, JsResult, Object, Value};

pub struct WasmGlobal {
    kind: NumericKind,
    mutable: bool,
    /// Value while no native handle is attached.
    value: RefCell<Val>,
    handle: OnceCell<wasmi::Global>,
}

impl WasmGlobal {
    /// Build from `{value, mutable?}` and an optional initial value.
    pub fn from_descriptor(scope: &mut Scope<'_>, descriptor: &Value, initial: &Value) -> JsResult<Self> {
        if descriptor.as_object().is_none() {
            return Err(scope.type_error("WebAssembly.Global(): Argument 0 must be a global descriptor"));
        }
        let mutable = scope.get(descriptor, "mutable")?.truthy();
        let type_name = scope.get(descriptor, "value")?;
        let Some(kind) = type_name.as_str().and_then(NumericKind::parse) else {
            return Err(scope.type_error(
                "WebAssembly.Global(): Descriptor property 'value' must be a WebAssembly type",
            ));
        };
        let value = if initial.is_undefined() {
            kind.zero()
        } else {
            coerce(scope, kind, initial, "WebAssembly.Global()")?
        };
        Ok(Self {
            kind,
            mutable,
            value: RefCell::new(value),
            handle: OnceCell::new(),
        })
    }

    pub fn attach(&self, global: wasmi::Global) {
        let _ = self.handle.set(global);
    }

    pub fn kind(&self) -> NumericKind {
        self.kind
    }

    pub fn is_mutable(&self) -> bool {
        self.mutable
    }

    pub fn value(&self, scope: &Scope<'_>) -> Value {
        match self.handle.get() {
            Some(global) => to_value(&global.get(scope.store())),
            None => to_value(&self.value.borrow()),
        }
    }

    pub fn set_value(&self, scope: &mut Scope<'_>, value: &Value) -> JsResult<()> {
        if !self.mutable {
            return Err(scope.type_error(
                "WebAssembly.Global.value: Can't set the value of an immutable global.",
            ));
        }
        let val = coerce(scope, self.kind, value, "WebAssembly.Global.value")?;
        match self.handle.get() {
            Some(global) => global
                .set(scope.store_mut(), val)
                .map_err(|e| scope.type_error(format!("WebAssembly.Global.value: {e}"))),
            None => {
                *self.value.borrow_mut() = val;
                Ok(())
            }
        }
    }
}

fn coerce(scope: &Scope<'_>, kind: NumericKind, value: &Value, context: &str) -> JsResult<Val> {
    kind.coerce(value).ok_or_else(|| {
        scope.type_error(format!(
            "{context}: value of type {} cannot be converted to {kind}",
            value.type_of()
        ))
    })
}

impl HostObject for WasmGlobal {
    fn class_name(&self) -> &'static str {
        "WebAssembly.Global"
    }

    fn get(&self, scope: &mut Scope<'_>, key: &str) -> JsResult<Option<Value>> {
        Ok(match key {
            "value" => Some(self.value(scope)),
            _ => None,
        })
    }

    fn set(&self, scope: &mut Scope<'_>, key: &str, value: &Value) -> JsResult<bool> {
        if key != "value" {
            return Ok(false);
        }
        self.set_value(scope, value)?;
        Ok(true)
    }

    fn keys(&self) -> Vec<String> {
        vec!["value".to_string()]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn instantiate(scope: &Scope<'_>, global: WasmGlobal) -> Object {
    let proto = scope.prototypes().global.clone();
    scope.realm().new_host(global, &proto)
}

/// `new WebAssembly.Global(descriptor, value?)`.
pub(crate) fn construct(scope: &mut Scope<'_>, _this: &Value, args: &[Value]) -> JsResult<Value> {
    let descriptor = args.first().cloned().unwrap_or_default();
    let initial = args.get(1).cloned().unwrap_or_default();
    let global = WasmGlobal::from_descriptor(scope, &descriptor, &initial)?;
    Ok(instantiate(scope, global).into())
}

/// Reflect an exported global; reference-typed globals reflect as `undefined`.
pub(crate) fn wrap(scope: &mut Scope<'_>, native: wasmi::Global) -> JsResult<Value> {
    let ty = native.ty(scope.store());
    let Some(kind) = NumericKind::of(ty.content()) else {
        return Ok(Value::Undefined);
    };
    let descriptor = scope.realm().new_object();
    descriptor.set_own("value", kind.as_str());
    descriptor.set_own("mutable", matches!(ty.mutability(), Mutability::Var));
    let initial = to_value(&native.get(scope.store()));
    let global = WasmGlobal::from_descriptor(scope, &descriptor.into(), &initial)?;
    global.attach(native);
    Ok(instantiate(scope, global).into())
}

/// `Global.prototype.valueOf()`.
pub(crate) fn value_of(scope: &mut Scope<'_>, this: &Value, _args: &[Value]) -> JsResult<Value> {
    match this.as_object().and_then(Object::host::<WasmGlobal>) {
        Some(global) => Ok(global.value(scope)),
        None => Err(scope.type_error("WebAssembly.Global.valueOf(): Receiver is not a WebAssembly.Global")),
    }
}
