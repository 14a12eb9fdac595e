//! The capability interface implemented by native-backed objects.

use std::any::Any;

use super::value::{JsResult, Value};
use crate::context::Scope;

/// A script object whose properties are served by Rust code.
///
/// `get` returns `Ok(None)` for keys the host does not own; lookup then
/// continues with the object's expando properties and its prototype chain,
/// which is where methods such as `grow` or `valueOf` live.
pub trait HostObject: Any {
    /// Tag used by `Object.prototype.toString`-style rendering.
    fn class_name(&self) -> &'static str;

    fn get(&self, scope: &mut Scope<'_>, key: &str) -> JsResult<Option<Value>>;

    /// Returns `true` when the write was consumed by the host.
    fn set(&self, _scope: &mut Scope<'_>, _key: &str, _value: &Value) -> JsResult<bool> {
        Ok(false)
    }

    /// Returns `true` when the key was removed.
    fn delete(&self, _key: &str) -> bool {
        false
    }

    /// Own enumerable keys, in their natural order.
    fn keys(&self) -> Vec<String>;

    fn has(&self, key: &str) -> bool {
        self.keys().iter().any(|k| k == key)
    }

    fn as_any(&self) -> &dyn Any;
}
