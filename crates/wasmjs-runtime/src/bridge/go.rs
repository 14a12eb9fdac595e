//! The script-visible `Go` object and its import object.

use std::any::Any;
use std::cell::{OnceCell, RefCell};

use wasmi::{Func, Linker};
use wasmjs_abi::layout::{IMPORT_MODULE, IMPORT_MODULE_LEGACY};

use super::{imports, BridgeId};
use crate::context::{HostState, Scope};
use crate::script::{HostObject, JsResult, Object, Value};

/// A `new Go()` instance.
pub struct GoBridge {
    id: BridgeId,
    import_object: OnceCell<Object>,
    argv: OnceCell<Object>,
}

impl GoBridge {
    pub(crate) fn new(id: BridgeId) -> Self {
        Self {
            id,
            import_object: OnceCell::new(),
            argv: OnceCell::new(),
        }
    }

    pub fn id(&self) -> BridgeId {
        self.id
    }

    pub fn import_object(&self, scope: &Scope<'_>) -> Object {
        self.import_object
            .get_or_init(|| {
                let proto = scope.prototypes().import_object.clone();
                scope.realm().new_host(GoImportObject::new(self.id), &proto)
            })
            .clone()
    }

    pub fn argv(&self, scope: &Scope<'_>) -> Object {
        self.argv
            .get_or_init(|| scope.realm().new_array(Vec::new()))
            .clone()
    }

    /// String entries of the script-visible `argv` array.
    pub(crate) fn extra_args(&self) -> Vec<String> {
        self.argv
            .get()
            .and_then(|a| {
                a.array_items()
                    .map(|items| items.iter().map(Value::to_display_string).collect())
            })
            .unwrap_or_default()
    }
}

impl HostObject for GoBridge {
    fn class_name(&self) -> &'static str {
        "Go"
    }

    fn get(&self, scope: &mut Scope<'_>, key: &str) -> JsResult<Option<Value>> {
        let exit_code = scope.state().bridge(self.id).ok().and_then(|b| b.exit_code);
        Ok(match key {
            "importObject" => Some(self.import_object(scope).into()),
            "argv" => Some(self.argv(scope).into()),
            "exited" => Some(Value::Bool(exit_code.is_some())),
            "exitCode" => Some(exit_code.map_or(Value::Undefined, Value::from)),
            _ => None,
        })
    }

    fn keys(&self) -> Vec<String> {
        ["importObject", "argv", "exited", "exitCode"]
            .map(String::from)
            .to_vec()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The import source generated for one bridge.
pub struct GoImportObject {
    bridge: BridgeId,
    funcs: RefCell<Option<Vec<(&'static str, Func)>>>,
}

impl GoImportObject {
    fn new(bridge: BridgeId) -> Self {
        Self {
            bridge,
            funcs: RefCell::new(None),
        }
    }

    pub fn bridge(&self) -> BridgeId {
        self.bridge
    }

    /// A linker resolving the import namespace under both module names.
    pub(crate) fn linker(&self, scope: &mut Scope<'_>) -> Result<Linker<HostState>, wasmi::Error> {
        let funcs = self
            .funcs
            .borrow_mut()
            .get_or_insert_with(|| imports::define(scope.store_mut(), self.bridge))
            .clone();
        let mut linker = Linker::new(scope.store().engine());
        for module in [IMPORT_MODULE, IMPORT_MODULE_LEGACY] {
            for (name, func) in &funcs {
                linker.define(module, name, *func)?;
            }
        }
        Ok(linker)
    }
}

impl HostObject for GoImportObject {
    fn class_name(&self) -> &'static str {
        "ImportObject"
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
