//! `WebAssembly.Module`.

use std::any::Any;
use std::cell::OnceCell;

use wasmparser::{ExternalKind, KnownCustom, Name, Parser, Payload, TypeRef};

use crate::context::Scope;
use crate::error::{RuntimeError, RuntimeResult};
use crate::script::{HostObject, JsResult, Object, Realm, Value};

/// Kind of an import or export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternKind {
    Function,
    Global,
    Memory,
    Table,
    Tag,
}

impl ExternKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ExternKind::Function => "function",
            ExternKind::Global => "global",
            ExternKind::Memory => "memory",
            ExternKind::Table => "table",
            ExternKind::Tag => "tag",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDescriptor {
    pub name: String,
    pub kind: ExternKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDescriptor {
    pub module: String,
    pub name: String,
    pub kind: ExternKind,
}

/// Import/export tables and the module name, in declaration order.
#[derive(Debug, Default)]
struct Descriptors {
    name: Option<String>,
    exports: Vec<ExportDescriptor>,
    imports: Vec<ImportDescriptor>,
}

fn parse_descriptors(bytes: &[u8]) -> Result<Descriptors, wasmparser::BinaryReaderError> {
    let mut out = Descriptors::default();
    for payload in Parser::new(0).parse_all(bytes) {
        match payload? {
            Payload::ImportSection(reader) => {
                for import in reader {
                    let import = import?;
                    let kind = match import.ty {
                        TypeRef::Func(_) => ExternKind::Function,
                        TypeRef::Table(_) => ExternKind::Table,
                        TypeRef::Memory(_) => ExternKind::Memory,
                        TypeRef::Global(_) => ExternKind::Global,
                        TypeRef::Tag(_) => ExternKind::Tag,
                    };
                    out.imports.push(ImportDescriptor {
                        module: import.module.to_string(),
                        name: import.name.to_string(),
                        kind,
                    });
                }
            }
            Payload::ExportSection(reader) => {
                for export in reader {
                    let export = export?;
                    let kind = match export.kind {
                        ExternalKind::Func => ExternKind::Function,
                        ExternalKind::Table => ExternKind::Table,
                        ExternalKind::Memory => ExternKind::Memory,
                        ExternalKind::Global => ExternKind::Global,
                        ExternalKind::Tag => ExternKind::Tag,
                    };
                    out.exports.push(ExportDescriptor {
                        name: export.name.to_string(),
                        kind,
                    });
                }
            }
            Payload::CustomSection(section) => {
                if let KnownCustom::Name(names) = section.as_known() {
                    for name in names {
                        if let Ok(Name::Module { name, .. }) = name {
                            out.name = Some(name.to_string());
                        }
                    }
                }
            }
            _ => {}
        }
    }
    Ok(out)
}

/// A compiled module.
pub struct WasmModule {
    module: wasmi::Module,
    descriptors: Descriptors,
    export_list: OnceCell<Object>,
    import_list: OnceCell<Object>,
}

impl WasmModule {
    pub fn compile(engine: &wasmi::Engine, bytes: &[u8]) -> RuntimeResult<Self> {
        let module = wasmi::Module::new(engine, bytes)?;
        let descriptors =
            parse_descriptors(bytes).map_err(|e| RuntimeError::Type(format!("malformed module: {e}")))?;
        Ok(Self {
            module,
            descriptors,
            export_list: OnceCell::new(),
            import_list: OnceCell::new(),
        })
    }

    pub fn native(&self) -> &wasmi::Module {
        &self.module
    }

    /// Module name from the `name` custom section.
    pub fn name(&self) -> Option<&str> {
        self.descriptors.name.as_deref()
    }

    pub fn exports(&self) -> &[ExportDescriptor] {
        &self.descriptors.exports
    }

    pub fn imports(&self) -> &[ImportDescriptor] {
        &self.descriptors.imports
    }

    /// `WebAssembly.Module.exports(module)`: `[{name, kind}]`, built once.
    pub fn export_list(&self, realm: &Realm) -> Object {
        self.export_list
            .get_or_init(|| {
                let items = self
                    .exports()
                    .iter()
                    .map(|e| {
                        let d = realm.new_object();
                        d.set_own("name", e.name.as_str());
                        d.set_own("kind", e.kind.as_str());
                        d.into()
                    })
                    .collect();
                realm.new_array(items)
            })
            .clone()
    }

    /// `WebAssembly.Module.imports(module)`: `[{module, name, kind}]`.
    pub fn import_list(&self, realm: &Realm) -> Object {
        self.import_list
            .get_or_init(|| {
                let items = self
                    .imports()
                    .iter()
                    .map(|i| {
                        let d = realm.new_object();
                        d.set_own("module", i.module.as_str());
                        d.set_own("name", i.name.as_str());
                        d.set_own("kind", i.kind.as_str());
                        d.into()
                    })
                    .collect();
                realm.new_array(items)
            })
            .clone()
    }
}

impl HostObject for WasmModule {
    fn class_name(&self) -> &'static str {
        "WebAssembly.Module"
    }

    fn get(&self, _scope: &mut Scope<'_>, _key: &str) -> JsResult<Option<Value>> {
        Ok(None)
    }

    fn keys(&self) -> Vec<String> {
        Vec::new()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `new WebAssembly.Module(bytes)`.
pub(crate) fn construct(scope: &mut Scope<'_>, _this: &Value, args: &[Value]) -> JsResult<Value> {
    let bytes = match args.first() {
        Some(Value::Object(o)) => o.read_bytes(scope),
        _ => None,
    };
    let Some(bytes) = bytes else {
        return Err(scope.type_error("WebAssembly.Module(): Argument 0 must be a buffer source"));
    };
    let engine = scope.store().engine().clone();
    let module = match WasmModule::compile(&engine, &bytes) {
        Ok(m) => m,
        Err(RuntimeError::Engine(e)) => return Err(scope.engine_error("WebAssembly.Module", e)),
        Err(e) => return Err(scope.type_error(format!("WebAssembly.Module: {e}"))),
    };
    let proto = scope.prototypes().module.clone();
    Ok(scope.realm().new_host(module, &proto).into())
}

fn module_arg<'v>(scope: &Scope<'_>, args: &'v [Value], what: &str) -> JsResult<&'v WasmModule> {
    args.first()
        .and_then(Value::as_object)
        .and_then(Object::host::<WasmModule>)
        .ok_or_else(|| {
            scope.type_error(format!(
                "WebAssembly.Module.{what}(): Argument 0 must be a WebAssembly.Module"
            ))
        })
}

/// `WebAssembly.Module.exports(module)`.
pub(crate) fn exports(scope: &mut Scope<'_>, _this: &Value, args: &[Value]) -> JsResult<Value> {
    let module = module_arg(scope, args, "exports")?;
    Ok(module.export_list(&scope.realm()).into())
}

/// `WebAssembly.Module.imports(module)`.
pub(crate) fn imports(scope: &mut Scope<'_>, _this: &Value, args: &[Value]) -> JsResult<Value> {
    let module = module_arg(scope, args, "imports")?;
    Ok(module.import_list(&scope.realm()).into())
}
