//! Reference-counted script objects.
//!
//! An [`Object`] is a shared handle: cloning it yields the same object, and
//! identity is pointer identity.  Every object carries insertion-ordered
//! named properties and an optional prototype; the [`ObjectKind`] adds the
//! exotic behavior of arrays, functions, byte buffers and host objects.

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use super::host::HostObject;
use super::value::{JsResult, Value};
use crate::context::Scope;

/// Largest array length kept in dense storage.  Indices at or past it are
/// stored as named properties and `length` may not exceed it.
pub const MAX_DENSE_LENGTH: usize = 1 << 20;

/// Largest byte length of a newly allocated buffer.
pub const MAX_BYTE_LENGTH: usize = 1 << 30;

/// Signature of natively implemented functions: `(scope, this, args)`.
pub type NativeFn = dyn Fn(&mut Scope<'_>, &Value, &[Value]) -> JsResult<Value>;

#[derive(Clone)]
pub struct Object(Rc<ObjectData>);

pub struct ObjectData {
    kind: ObjectKind,
    properties: RefCell<Vec<(String, Value)>>,
    prototype: Option<Object>,
}

pub enum ObjectKind {
    Ordinary,
    Array(RefCell<Vec<Value>>),
    Function(Function),
    /// An error object; `name` and `message` are own properties.
    Error,
    ArrayBuffer(ArrayBuffer),
    Uint8Array(Uint8Array),
    Host(Rc<dyn HostObject>),
}

pub struct Function {
    name: Rc<str>,
    call: Rc<NativeFn>,
    constructor: bool,
}

/// Backing store of an `ArrayBuffer`.
pub enum ByteStore {
    Owned(Vec<u8>),
    /// A live alias of an instance's linear memory, `len` bytes long.
    Linear { memory: wasmi::Memory, len: usize },
    Detached,
}

pub struct ArrayBuffer {
    store: RefCell<ByteStore>,
}

/// A byte view over an `ArrayBuffer` object.
pub struct Uint8Array {
    buffer: Object,
    offset: usize,
    length: usize,
}

impl Function {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_constructor(&self) -> bool {
        self.constructor
    }

    pub(crate) fn callable(&self) -> Rc<NativeFn> {
        self.call.clone()
    }
}

impl ArrayBuffer {
    pub fn owned(bytes: Vec<u8>) -> Self {
        Self {
            store: RefCell::new(ByteStore::Owned(bytes)),
        }
    }

    pub fn linear(memory: wasmi::Memory, len: usize) -> Self {
        Self {
            store: RefCell::new(ByteStore::Linear { memory, len }),
        }
    }

    pub fn byte_len(&self) -> usize {
        match &*self.store.borrow() {
            ByteStore::Owned(bytes) => bytes.len(),
            ByteStore::Linear { len, .. } => *len,
            ByteStore::Detached => 0,
        }
    }

    pub fn is_detached(&self) -> bool {
        matches!(&*self.store.borrow(), ByteStore::Detached)
    }

    /// Drop the backing store; the buffer reads as empty afterwards.
    pub fn detach(&self) -> ByteStore {
        std::mem::replace(&mut *self.store.borrow_mut(), ByteStore::Detached)
    }

    /// Copy `len` bytes from `offset`, clamped to the buffer.
    pub fn read(&self, scope: &Scope<'_>, offset: usize, len: usize) -> Vec<u8> {
        let store = self.store.borrow();
        let bytes: &[u8] = match &*store {
            ByteStore::Owned(bytes) => bytes,
            ByteStore::Linear { memory, len } => {
                let data = memory.data(scope.store());
                &data[..(*len).min(data.len())]
            }
            ByteStore::Detached => &[],
        };
        let start = offset.min(bytes.len());
        let end = offset.saturating_add(len).min(bytes.len());
        bytes[start..end].to_vec()
    }

    /// Write `src` at `offset`, clamped to the buffer; returns bytes written.
    pub fn write(&self, scope: &mut Scope<'_>, offset: usize, src: &[u8]) -> usize {
        let mut store = self.store.borrow_mut();
        let bytes: &mut [u8] = match &mut *store {
            ByteStore::Owned(bytes) => bytes,
            ByteStore::Linear { memory, len } => {
                let data = memory.data_mut(scope.store_mut());
                let end = (*len).min(data.len());
                &mut data[..end]
            }
            ByteStore::Detached => return 0,
        };
        if offset >= bytes.len() {
            return 0;
        }
        let n = src.len().min(bytes.len() - offset);
        bytes[offset..offset + n].copy_from_slice(&src[..n]);
        n
    }
}

impl Uint8Array {
    pub fn new(buffer: Object, offset: usize, length: usize) -> Self {
        Self {
            buffer,
            offset,
            length,
        }
    }

    pub fn buffer(&self) -> &Object {
        &self.buffer
    }

    pub fn byte_offset(&self) -> usize {
        self.offset
    }

    /// Visible length; shrinks to zero when the buffer is detached.
    pub fn len(&self) -> usize {
        let available = self
            .buffer
            .array_buffer()
            .map_or(0, |b| b.byte_len().saturating_sub(self.offset));
        self.length.min(available)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_vec(&self, scope: &Scope<'_>) -> Vec<u8> {
        match self.buffer.array_buffer() {
            Some(b) => b.read(scope, self.offset, self.len()),
            None => Vec::new(),
        }
    }

    /// Copy `src` into the start of the view; returns bytes written.
    pub fn copy_from(&self, scope: &mut Scope<'_>, src: &[u8]) -> usize {
        let n = src.len().min(self.len());
        match self.buffer.array_buffer() {
            Some(b) => b.write(scope, self.offset, &src[..n]),
            None => 0,
        }
    }
}

/// Canonical array index of a property key.
fn index_key(key: &str) -> Option<usize> {
    let i = key.parse::<usize>().ok()?;
    (i.to_string() == key).then_some(i)
}

/// Script `ToUint8`.
fn to_uint8(value: &Value) -> u8 {
    match value {
        Value::Integer(i) => *i as u8,
        Value::Number(n) if n.is_finite() => n.trunc().rem_euclid(256.0) as u8,
        Value::Bool(true) => 1,
        _ => 0,
    }
}

impl Object {
    pub fn new(kind: ObjectKind, prototype: Option<Object>) -> Self {
        Object(Rc::new(ObjectData {
            kind,
            properties: RefCell::new(Vec::new()),
            prototype,
        }))
    }

    /// A native function object.
    pub fn function(
        name: &str,
        constructor: bool,
        prototype: Option<Object>,
        call: impl Fn(&mut Scope<'_>, &Value, &[Value]) -> JsResult<Value> + 'static,
    ) -> Self {
        Object::new(
            ObjectKind::Function(Function {
                name: name.into(),
                call: Rc::new(call),
                constructor,
            }),
            prototype,
        )
    }

    pub fn kind(&self) -> &ObjectKind {
        &self.0.kind
    }

    pub fn ptr_eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Address-based identity key, stable while the object is alive.
    pub fn identity(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    pub fn class_name(&self) -> &'static str {
        match &self.0.kind {
            ObjectKind::Ordinary => "Object",
            ObjectKind::Array(_) => "Array",
            ObjectKind::Function(_) => "Function",
            ObjectKind::Error => "Error",
            ObjectKind::ArrayBuffer(_) => "ArrayBuffer",
            ObjectKind::Uint8Array(_) => "Uint8Array",
            ObjectKind::Host(h) => h.class_name(),
        }
    }

    pub fn prototype(&self) -> Option<Object> {
        self.0.prototype.clone()
    }

    pub fn is_plain(&self) -> bool {
        matches!(self.0.kind, ObjectKind::Ordinary)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self.0.kind, ObjectKind::Function(_))
    }

    pub fn as_function(&self) -> Option<&Function> {
        match &self.0.kind {
            ObjectKind::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn array_buffer(&self) -> Option<&ArrayBuffer> {
        match &self.0.kind {
            ObjectKind::ArrayBuffer(b) => Some(b),
            _ => None,
        }
    }

    pub fn uint8_array(&self) -> Option<&Uint8Array> {
        match &self.0.kind {
            ObjectKind::Uint8Array(v) => Some(v),
            _ => None,
        }
    }

    /// Downcast a host object to its concrete type.
    pub fn host<T: HostObject>(&self) -> Option<&T> {
        match &self.0.kind {
            ObjectKind::Host(h) => h.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Elements of an array object.
    pub fn array_items(&self) -> Option<Ref<'_, Vec<Value>>> {
        match &self.0.kind {
            ObjectKind::Array(items) => Some(items.borrow()),
            _ => None,
        }
    }

    pub fn push(&self, value: Value) {
        if let ObjectKind::Array(items) = &self.0.kind {
            items.borrow_mut().push(value);
        }
    }

    /// Bytes of an `ArrayBuffer` or `Uint8Array`.
    pub fn read_bytes(&self, scope: &Scope<'_>) -> Option<Vec<u8>> {
        match &self.0.kind {
            ObjectKind::ArrayBuffer(b) => Some(b.read(scope, 0, b.byte_len())),
            ObjectKind::Uint8Array(v) => Some(v.to_vec(scope)),
            _ => None,
        }
    }

    // ── Plain own properties (no exotic behavior, no scope) ─────────────────

    pub fn get_own(&self, key: &str) -> Value {
        self.0
            .properties
            .borrow()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .unwrap_or_default()
    }

    pub fn has_own(&self, key: &str) -> bool {
        self.0.properties.borrow().iter().any(|(k, _)| k == key)
    }

    pub fn set_own(&self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        let mut props = self.0.properties.borrow_mut();
        match props.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => props.push((key.to_string(), value)),
        }
    }

    fn remove_own(&self, key: &str) -> bool {
        let mut props = self.0.properties.borrow_mut();
        let before = props.len();
        props.retain(|(k, _)| k != key);
        props.len() != before
    }

    // ── Full property protocol ──────────────────────────────────────────────

    /// `[[Get]]` with prototype lookup.
    pub fn get(&self, scope: &mut Scope<'_>, key: &str) -> JsResult<Value> {
        let mut current = self.clone();
        loop {
            if let Some(v) = current.own_property(scope, key)? {
                return Ok(v);
            }
            match current.prototype() {
                Some(p) => current = p,
                None => return Ok(Value::Undefined),
            }
        }
    }

    fn own_property(&self, scope: &mut Scope<'_>, key: &str) -> JsResult<Option<Value>> {
        match &self.0.kind {
            ObjectKind::Host(h) => {
                let host = h.clone();
                if let Some(v) = host.get(scope, key)? {
                    return Ok(Some(v));
                }
            }
            ObjectKind::Array(items) => {
                let items = items.borrow();
                if key == "length" {
                    return Ok(Some(Value::Integer(items.len() as i64)));
                }
                if let Some(item) = index_key(key).and_then(|i| items.get(i)) {
                    return Ok(Some(item.clone()));
                }
            }
            ObjectKind::Function(f) => {
                if key == "name" && !self.has_own("name") {
                    return Ok(Some(Value::string(f.name.clone())));
                }
            }
            ObjectKind::ArrayBuffer(b) => {
                if key == "byteLength" {
                    return Ok(Some(Value::Integer(b.byte_len() as i64)));
                }
            }
            ObjectKind::Uint8Array(v) => match key {
                "length" | "byteLength" => return Ok(Some(Value::Integer(v.len() as i64))),
                "byteOffset" => return Ok(Some(Value::Integer(v.offset as i64))),
                "buffer" => return Ok(Some(Value::Object(v.buffer.clone()))),
                _ => {
                    if let Some(i) = index_key(key) {
                        if i >= v.len() {
                            return Ok(Some(Value::Undefined));
                        }
                        let byte = v
                            .buffer
                            .array_buffer()
                            .map(|b| b.read(scope, v.offset + i, 1))
                            .and_then(|bytes| bytes.first().copied());
                        return Ok(Some(byte.map_or(Value::Undefined, |b| {
                            Value::Integer(i64::from(b))
                        })));
                    }
                }
            },
            ObjectKind::Ordinary | ObjectKind::Error => {}
        }
        let props = self.0.properties.borrow();
        Ok(props.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone()))
    }

    /// `[[Set]]`; writes land on the receiver itself.
    pub fn set(&self, scope: &mut Scope<'_>, key: &str, value: Value) -> JsResult<()> {
        match &self.0.kind {
            ObjectKind::Host(h) => {
                let host = h.clone();
                if host.set(scope, key, &value)? {
                    return Ok(());
                }
            }
            ObjectKind::Array(items) => {
                if key == "length" {
                    let len = value
                        .as_number()
                        .filter(|n| *n >= 0.0 && n.fract() == 0.0 && *n <= MAX_DENSE_LENGTH as f64)
                        .ok_or_else(|| scope.range_error("Invalid array length"))?
                        as usize;
                    items.borrow_mut().resize(len, Value::Undefined);
                    return Ok(());
                }
                if let Some(i) = index_key(key).filter(|&i| i < MAX_DENSE_LENGTH) {
                    let mut items = items.borrow_mut();
                    if i >= items.len() {
                        items.resize(i + 1, Value::Undefined);
                    }
                    items[i] = value;
                    return Ok(());
                }
            }
            ObjectKind::Uint8Array(v) => {
                if let Some(i) = index_key(key) {
                    if i < v.len() {
                        if let Some(b) = v.buffer.array_buffer() {
                            b.write(scope, v.offset + i, &[to_uint8(&value)]);
                        }
                    }
                    return Ok(());
                }
            }
            _ => {}
        }
        self.set_own(key, value);
        Ok(())
    }

    /// `[[Delete]]`; returns whether the key is gone.
    pub fn delete(&self, key: &str) -> bool {
        match &self.0.kind {
            ObjectKind::Host(h) => h.delete(key) || self.remove_own(key) || !h.has(key),
            ObjectKind::Array(items) => {
                if let Some(i) = index_key(key) {
                    if let Some(slot) = items.borrow_mut().get_mut(i) {
                        *slot = Value::Undefined;
                        return true;
                    }
                }
                self.remove_own(key);
                true
            }
            _ => {
                self.remove_own(key);
                true
            }
        }
    }

    /// Own enumerable keys.
    pub fn keys(&self) -> Vec<String> {
        let mut keys = match &self.0.kind {
            ObjectKind::Host(h) => h.keys(),
            ObjectKind::Array(items) => (0..items.borrow().len()).map(|i| i.to_string()).collect(),
            ObjectKind::Uint8Array(v) => (0..v.len()).map(|i| i.to_string()).collect(),
            _ => Vec::new(),
        };
        keys.extend(self.0.properties.borrow().iter().map(|(k, _)| k.clone()));
        keys
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[object {}]", self.class_name())
    }
}
