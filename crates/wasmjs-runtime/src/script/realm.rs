//! The global object and built-in constructors.

use std::rc::Rc;

use super::host::HostObject;
use super::object::{
    ArrayBuffer, Object, ObjectKind, Uint8Array, MAX_BYTE_LENGTH, MAX_DENSE_LENGTH,
};
use super::value::{JsResult, Thrown, Value};
use crate::context::Scope;

/// Built-in error constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Error,
    TypeError,
    RangeError,
}

impl ErrorKind {
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::RangeError => "RangeError",
        }
    }
}

struct Intrinsics {
    global: Object,
    object_prototype: Object,
    function_prototype: Object,
    array_prototype: Object,
    error_prototype: Object,
    type_error_prototype: Object,
    range_error_prototype: Object,
    array_buffer_prototype: Object,
    uint8_array_prototype: Object,
}

/// A shared handle to the global object and the intrinsic prototypes.
#[derive(Clone)]
pub struct Realm(Rc<Intrinsics>);

fn ordinary(prototype: &Object) -> Object {
    Object::new(ObjectKind::Ordinary, Some(prototype.clone()))
}

fn new_error_prototype(parent: &Object, name: &str) -> Object {
    let proto = ordinary(parent);
    proto.set_own("name", name);
    proto.set_own("message", "");
    proto
}

fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or_default()
}

fn length_arg(scope: &Scope<'_>, value: &Value, what: &str, max: usize) -> JsResult<usize> {
    match value.as_number() {
        Some(n) if n >= 0.0 && n.fract() == 0.0 && n <= max as f64 => Ok(n as usize),
        Some(_) => Err(scope.range_error(format!("Invalid {what} length"))),
        None if value.is_undefined() => Ok(0),
        None => Err(scope.type_error(format!("{what} length must be a number"))),
    }
}

impl Realm {
    pub fn new() -> Self {
        let object_prototype = Object::new(ObjectKind::Ordinary, None);
        let function_prototype = ordinary(&object_prototype);
        let array_prototype = ordinary(&object_prototype);
        let error_prototype = new_error_prototype(&object_prototype, "Error");
        let type_error_prototype = new_error_prototype(&error_prototype, "TypeError");
        let range_error_prototype = new_error_prototype(&error_prototype, "RangeError");
        let array_buffer_prototype = ordinary(&object_prototype);
        let uint8_array_prototype = ordinary(&object_prototype);
        let global = ordinary(&object_prototype);

        let realm = Realm(Rc::new(Intrinsics {
            global,
            object_prototype,
            function_prototype,
            array_prototype,
            error_prototype,
            type_error_prototype,
            range_error_prototype,
            array_buffer_prototype,
            uint8_array_prototype,
        }));
        realm.install_builtins();
        realm
    }

    fn install_builtins(&self) {
        let global = self.global();
        global.set_own("globalThis", global.clone());

        let object = self.new_constructor("Object", &self.0.object_prototype, |scope, _, args| {
            match args.first() {
                Some(Value::Object(o)) => Ok(Value::Object(o.clone())),
                _ => Ok(scope.realm().new_object().into()),
            }
        });
        global.set_own("Object", object);

        let array = self.new_constructor("Array", &self.0.array_prototype, |scope, _, args| {
            let realm = scope.realm();
            if let [len @ (Value::Integer(_) | Value::Number(_))] = args {
                let n = length_arg(scope, len, "array", MAX_DENSE_LENGTH)?;
                return Ok(realm.new_array(vec![Value::Undefined; n]).into());
            }
            Ok(realm.new_array(args.to_vec()).into())
        });
        global.set_own("Array", array);

        for kind in [ErrorKind::Error, ErrorKind::TypeError, ErrorKind::RangeError] {
            let ctor = self.new_constructor(kind.name(), self.error_prototype(kind), move |scope, _, args| {
                let message = match args.first() {
                    None | Some(Value::Undefined) => String::new(),
                    Some(v) => v.to_display_string(),
                };
                Ok(scope.realm().new_error(kind, message).into())
            });
            global.set_own(kind.name(), ctor);
        }

        let array_buffer = self.new_constructor(
            "ArrayBuffer",
            &self.0.array_buffer_prototype,
            |scope, _, args| {
                let n = length_arg(scope, &arg(args, 0), "array buffer", MAX_BYTE_LENGTH)?;
                Ok(scope.realm().new_array_buffer(vec![0; n]).into())
            },
        );
        global.set_own("ArrayBuffer", array_buffer);

        let uint8_array = self.new_constructor(
            "Uint8Array",
            &self.0.uint8_array_prototype,
            |scope, _, args| {
                let realm = scope.realm();
                let source = arg(args, 0);
                let Value::Object(obj) = &source else {
                    let n = length_arg(scope, &source, "typed array", MAX_BYTE_LENGTH)?;
                    return Ok(realm.new_uint8_array(vec![0; n]).into());
                };
                if let Some(buffer) = obj.array_buffer() {
                    let total = buffer.byte_len();
                    let offset = length_arg(scope, &arg(args, 1), "offset", MAX_BYTE_LENGTH)?;
                    if offset > total {
                        return Err(scope.range_error("Start offset is outside the bounds of the buffer"));
                    }
                    let length = match arg(args, 2) {
                        Value::Undefined => total - offset,
                        v => length_arg(scope, &v, "typed array", MAX_BYTE_LENGTH)?,
                    };
                    if offset + length > total {
                        return Err(scope.range_error("Invalid typed array length"));
                    }
                    return Ok(realm.uint8_array_view(obj.clone(), offset, length).into());
                }
                if let Some(bytes) = obj.read_bytes(scope) {
                    return Ok(realm.new_uint8_array(bytes).into());
                }
                let items: Vec<Value> = obj.array_items().map(|items| items.clone()).unwrap_or_default();
                let bytes = items
                    .iter()
                    .map(|v| v.as_number().map_or(0, |n| n as i64 as u8))
                    .collect();
                Ok(realm.new_uint8_array(bytes).into())
            },
        );
        global.set_own("Uint8Array", uint8_array);

        super::date::install(self);
    }

    pub fn global(&self) -> &Object {
        &self.0.global
    }

    pub fn object_prototype(&self) -> &Object {
        &self.0.object_prototype
    }

    pub fn error_prototype(&self, kind: ErrorKind) -> &Object {
        match kind {
            ErrorKind::Error => &self.0.error_prototype,
            ErrorKind::TypeError => &self.0.type_error_prototype,
            ErrorKind::RangeError => &self.0.range_error_prototype,
        }
    }

    pub fn new_object(&self) -> Object {
        ordinary(&self.0.object_prototype)
    }

    pub fn new_array(&self, items: Vec<Value>) -> Object {
        Object::new(
            ObjectKind::Array(items.into()),
            Some(self.0.array_prototype.clone()),
        )
    }

    pub fn new_function(
        &self,
        name: &str,
        call: impl Fn(&mut Scope<'_>, &Value, &[Value]) -> JsResult<Value> + 'static,
    ) -> Object {
        Object::function(name, false, Some(self.0.function_prototype.clone()), call)
    }

    /// A constructible function whose instances inherit from `prototype`.
    pub fn new_constructor(
        &self,
        name: &str,
        prototype: &Object,
        call: impl Fn(&mut Scope<'_>, &Value, &[Value]) -> JsResult<Value> + 'static,
    ) -> Object {
        let ctor = Object::function(name, true, Some(self.0.function_prototype.clone()), call);
        ctor.set_own("prototype", prototype.clone());
        ctor
    }

    pub fn new_error(&self, kind: ErrorKind, message: impl Into<String>) -> Object {
        let error = Object::new(ObjectKind::Error, Some(self.error_prototype(kind).clone()));
        error.set_own("name", kind.name());
        error.set_own("message", message.into());
        error
    }

    pub fn throw(&self, kind: ErrorKind, message: impl Into<String>) -> Thrown {
        Thrown(self.new_error(kind, message).into())
    }

    pub fn new_array_buffer(&self, bytes: Vec<u8>) -> Object {
        Object::new(
            ObjectKind::ArrayBuffer(ArrayBuffer::owned(bytes)),
            Some(self.0.array_buffer_prototype.clone()),
        )
    }

    /// An `ArrayBuffer` aliasing the first `len` bytes of `memory`.
    pub fn new_linear_buffer(&self, memory: wasmi::Memory, len: usize) -> Object {
        Object::new(
            ObjectKind::ArrayBuffer(ArrayBuffer::linear(memory, len)),
            Some(self.0.array_buffer_prototype.clone()),
        )
    }

    pub fn uint8_array_view(&self, buffer: Object, offset: usize, length: usize) -> Object {
        Object::new(
            ObjectKind::Uint8Array(Uint8Array::new(buffer, offset, length)),
            Some(self.0.uint8_array_prototype.clone()),
        )
    }

    /// A `Uint8Array` over a fresh buffer holding `bytes`.
    pub fn new_uint8_array(&self, bytes: Vec<u8>) -> Object {
        let len = bytes.len();
        self.uint8_array_view(self.new_array_buffer(bytes), 0, len)
    }

    pub fn new_host(&self, host: impl HostObject, prototype: &Object) -> Object {
        Object::new(ObjectKind::Host(Rc::new(host)), Some(prototype.clone()))
    }
}

impl Default for Realm {
    fn default() -> Self {
        Self::new()
    }
}
