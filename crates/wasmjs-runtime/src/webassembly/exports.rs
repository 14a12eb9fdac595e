//! The `instance.exports` reflection object.
//!
//! Keys follow the module's export section order.  Each export is
//! reflected on first access and cached, so repeated reads return the same
//! script object: a memory's `buffer` memo lives on that object.

use std::any::Any;
use std::cell::RefCell;

use wasmi::{Extern, Func, Val};

use super::numeric::{to_value, NumericKind};
use super::{global, memory, table};
use crate::context::Scope;
use crate::script::{HostObject, JsResult, Object, Value};

pub struct InstanceExports {
    instance: wasmi::Instance,
    names: Vec<String>,
    cache: RefCell<Vec<Option<Value>>>,
}

impl InstanceExports {
    pub(crate) fn new(instance: wasmi::Instance, names: Vec<String>) -> Self {
        let cache = RefCell::new(vec![None; names.len()]);
        Self {
            instance,
            names,
            cache,
        }
    }

    fn reflect(&self, scope: &mut Scope<'_>, name: &str) -> JsResult<Value> {
        match self.instance.get_export(scope.store(), name) {
            Some(Extern::Func(func)) => Ok(reflect_function(scope, name, func).into()),
            Some(Extern::Memory(native)) => Ok(memory::wrap(scope, native)?.into()),
            Some(Extern::Global(native)) => global::wrap(scope, native),
            Some(Extern::Table(native)) => table::wrap(scope, native),
            None => Ok(Value::Undefined),
        }
    }
}

impl HostObject for InstanceExports {
    fn class_name(&self) -> &'static str {
        "Exports"
    }

    fn get(&self, scope: &mut Scope<'_>, key: &str) -> JsResult<Option<Value>> {
        let Some(index) = self.names.iter().position(|n| n == key) else {
            return Ok(None);
        };
        if let Some(value) = self.cache.borrow()[index].clone() {
            return Ok(Some(value));
        }
        let value = self.reflect(scope, key)?;
        self.cache.borrow_mut()[index] = Some(value.clone());
        Ok(Some(value))
    }

    fn set(&self, _scope: &mut Scope<'_>, key: &str, _value: &Value) -> JsResult<bool> {
        // Exports are read-only; swallow writes to existing names.
        Ok(self.has(key))
    }

    fn keys(&self) -> Vec<String> {
        self.names.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A script function calling the native export `func`.
fn reflect_function(scope: &Scope<'_>, name: &str, func: Func) -> Object {
    let label = name.to_string();
    scope
        .realm()
        .new_function(name, move |scope, _this, args| call_export(scope, &label, func, args))
}

fn call_export(scope: &mut Scope<'_>, name: &str, func: Func, args: &[Value]) -> JsResult<Value> {
    let ty = func.ty(scope.store());
    let params = ty.params();
    if args.len() < params.len() {
        return Err(scope.type_error(format!(
            "{name}: expected {} arguments, got {}",
            params.len(),
            args.len()
        )));
    }
    let mut inputs = Vec::with_capacity(params.len());
    for (index, (&param, arg)) in params.iter().zip(args).enumerate() {
        let val = match NumericKind::of(param) {
            Some(kind) => kind.coerce(arg),
            None if arg.is_nullish() => Some(Val::default(param)),
            None => None,
        };
        let Some(val) = val else {
            return Err(scope.type_error(format!(
                "{name}: argument {index} of type {} cannot be converted to {param:?}",
                arg.type_of()
            )));
        };
        inputs.push(val);
    }
    let mut outputs: Vec<Val> = ty.results().iter().map(|&t| Val::default(t)).collect();
    if let Err(err) = func.call(scope.store_mut(), &inputs, &mut outputs) {
        return Err(scope.engine_error(name, err));
    }
    Ok(match outputs.as_slice() {
        [] => Value::Undefined,
        [single] => to_value(single),
        many => scope
            .realm()
            .new_array(many.iter().map(to_value).collect())
            .into(),
    })
}
