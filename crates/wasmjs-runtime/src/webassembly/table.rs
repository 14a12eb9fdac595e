//! `WebAssembly.Table`.

use std::any::Any;
use std::cell::OnceCell;

use wasmi::core::ValType;

use crate::context::Scope;
use crate::script::{HostObject, JsResult, Object, Value};

/// Upper bound on table elements accepted by the constructor.
pub const MAX_ELEMENTS: u32 = 10_000_000;

pub struct WasmTable {
    element: &'static str,
    initial: u32,
    maximum: Option<u32>,
    handle: OnceCell<wasmi::Table>,
}

fn element_property(scope: &mut Scope<'_>, descriptor: &Value, key: &str) -> JsResult<Option<u32>> {
    let value = scope.get(descriptor, key)?;
    if value.is_undefined() {
        return Ok(None);
    }
    match value.as_number() {
        Some(n) if n.is_finite() && n >= 0.0 && n.trunc() <= f64::from(MAX_ELEMENTS) => {
            Ok(Some(n.trunc() as u32))
        }
        Some(n) => Err(scope.range_error(format!(
            "WebAssembly.Table(): Property '{key}': value {n} is above the upper bound {MAX_ELEMENTS}"
        ))),
        None => Err(scope.type_error(format!(
            "WebAssembly.Table(): Property '{key}' must be convertible to a valid number"
        ))),
    }
}

impl WasmTable {
    /// Build from `{element, initial, maximum?}`.
    pub fn from_descriptor(scope: &mut Scope<'_>, descriptor: &Value) -> JsResult<Self> {
        if descriptor.as_object().is_none() {
            return Err(scope.type_error("WebAssembly.Table(): Argument 0 must be a table descriptor"));
        }
        let element = match scope.get(descriptor, "element")?.as_str() {
            Some("anyfunc" | "funcref") => "anyfunc",
            Some("externref") => "externref",
            _ => {
                return Err(scope.type_error(
                    "WebAssembly.Table(): Descriptor property 'element' must be a WebAssembly reference type",
                ))
            }
        };
        let Some(initial) = element_property(scope, descriptor, "initial")? else {
            return Err(scope.type_error("WebAssembly.Table(): Property 'initial' is required"));
        };
        let maximum = element_property(scope, descriptor, "maximum")?;
        if maximum.is_some_and(|max| max < initial) {
            return Err(scope.range_error(
                "WebAssembly.Table(): Property 'maximum': value is below the lower bound",
            ));
        }
        Ok(Self {
            element,
            initial,
            maximum,
            handle: OnceCell::new(),
        })
    }

    pub fn attach(&self, table: wasmi::Table) {
        let _ = self.handle.set(table);
    }

    pub fn element(&self) -> &'static str {
        self.element
    }

    pub fn maximum(&self) -> Option<u32> {
        self.maximum
    }

    pub fn length(&self, scope: &Scope<'_>) -> u32 {
        match self.handle.get() {
            Some(table) => table.size(scope.store()),
            None => self.initial,
        }
    }
}

impl HostObject for WasmTable {
    fn class_name(&self) -> &'static str {
        "WebAssembly.Table"
    }

    fn get(&self, scope: &mut Scope<'_>, key: &str) -> JsResult<Option<Value>> {
        Ok(match key {
            "length" => Some(i64::from(self.length(scope)).into()),
            _ => None,
        })
    }

    fn keys(&self) -> Vec<String> {
        vec!["length".to_string()]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn instantiate(scope: &Scope<'_>, table: WasmTable) -> Object {
    let proto = scope.prototypes().table.clone();
    scope.realm().new_host(table, &proto)
}

/// `new WebAssembly.Table(descriptor)`.
pub(crate) fn construct(scope: &mut Scope<'_>, _this: &Value, args: &[Value]) -> JsResult<Value> {
    let descriptor = args.first().cloned().unwrap_or_default();
    let table = WasmTable::from_descriptor(scope, &descriptor)?;
    Ok(instantiate(scope, table).into())
}

/// Reflect an exported table.
pub(crate) fn wrap(scope: &mut Scope<'_>, native: wasmi::Table) -> JsResult<Value> {
    let ty = native.ty(scope.store());
    let descriptor = scope.realm().new_object();
    let element = match ty.element() {
        ValType::ExternRef => "externref",
        _ => "anyfunc",
    };
    descriptor.set_own("element", element);
    descriptor.set_own("initial", i64::from(ty.minimum()));
    if let Some(max) = ty.maximum() {
        descriptor.set_own("maximum", i64::from(max));
    }
    let table = WasmTable::from_descriptor(scope, &descriptor.into())?;
    table.attach(native);
    Ok(instantiate(scope, table).into())
}
