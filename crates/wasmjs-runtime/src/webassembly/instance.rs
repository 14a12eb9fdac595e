//! `WebAssembly.Instance`.

use std::any::Any;
use std::cell::OnceCell;

use wasmi::Linker;

use super::exports::InstanceExports;
use super::module::WasmModule;
use crate::bridge::GoImportObject;
use crate::context::{HostState, Scope};
use crate::script::{HostObject, JsResult, Object, Value};

pub struct WasmInstance {
    instance: wasmi::Instance,
    module: Object,
    exports: OnceCell<Object>,
}

/// Where an instance's imports come from.
enum ImportSource<'a> {
    Bridge(&'a GoImportObject),
    Empty,
    Wasi,
}

impl<'a> ImportSource<'a> {
    fn resolve(value: Option<&'a Value>) -> Self {
        let Some(object) = value.and_then(Value::as_object) else {
            return ImportSource::Wasi;
        };
        if let Some(import_object) = object.host::<GoImportObject>() {
            ImportSource::Bridge(import_object)
        } else if object.is_plain() {
            ImportSource::Empty
        } else {
            ImportSource::Wasi
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ImportSource::Bridge(_) => "bridge",
            ImportSource::Empty => "empty",
            ImportSource::Wasi => "wasi",
        }
    }

    fn linker(&self, scope: &mut Scope<'_>, module: &WasmModule) -> Result<Linker<HostState>, wasmi::Error> {
        match self {
            ImportSource::Bridge(import_object) => import_object.linker(scope),
            ImportSource::Empty => Ok(Linker::new(scope.store().engine())),
            ImportSource::Wasi => crate::wasi::linker(scope, module),
        }
    }
}

impl WasmInstance {
    pub fn native(&self) -> wasmi::Instance {
        self.instance
    }

    /// The `WebAssembly.Module` this instance was built from.
    pub fn module(&self) -> &Object {
        &self.module
    }

    pub fn exports(&self, scope: &Scope<'_>) -> Object {
        self.exports
            .get_or_init(|| {
                let names = self
                    .module
                    .host::<WasmModule>()
                    .map(|m| m.exports().iter().map(|e| e.name.clone()).collect())
                    .unwrap_or_default();
                let proto = scope.prototypes().exports.clone();
                scope
                    .realm()
                    .new_host(InstanceExports::new(self.instance, names), &proto)
            })
            .clone()
    }
}

impl HostObject for WasmInstance {
    fn class_name(&self) -> &'static str {
        "WebAssembly.Instance"
    }

    fn get(&self, scope: &mut Scope<'_>, key: &str) -> JsResult<Option<Value>> {
        Ok(match key {
            "exports" => Some(self.exports(scope).into()),
            _ => None,
        })
    }

    fn keys(&self) -> Vec<String> {
        vec!["exports".to_string()]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `new WebAssembly.Instance(module, importSource?)`.
pub(crate) fn construct(scope: &mut Scope<'_>, _this: &Value, args: &[Value]) -> JsResult<Value> {
    let Some(module_object) = args.first().and_then(Value::as_object) else {
        return Err(scope.type_error("WebAssembly.Instance(): Argument 0 must be a WebAssembly.Module"));
    };
    let Some(module) = module_object.host::<WasmModule>() else {
        return Err(scope.type_error("WebAssembly.Instance(): Argument 0 must be a WebAssembly.Module"));
    };

    let source = ImportSource::resolve(args.get(1));
    tracing::debug!(
        source = source.label(),
        module = module.name().unwrap_or("<anonymous>"),
        imports = module.imports().len(),
        "instantiating module"
    );

    let instance = source
        .linker(scope, module)
        .and_then(|linker| linker.instantiate(scope.store_mut(), module.native()))
        .and_then(|pre| pre.start(scope.store_mut()));
    let instance = match instance {
        Ok(instance) => instance,
        Err(err) => return Err(scope.engine_error("WebAssembly.Instance", err)),
    };

    let proto = scope.prototypes().instance.clone();
    let wrapped = WasmInstance {
        instance,
        module: module_object.clone(),
        exports: OnceCell::new(),
    };
    Ok(scope.realm().new_host(wrapped, &proto).into())
}
