//! `WebAssembly.Memory`.
//!
//! The `buffer` property is memoized.  The memo is dropped, and the old
//! buffer detached, whenever the memory grows: through `grow()` directly,
//! or when a later access sees a byte length different from the memo's
//! (the guest ran `memory.grow` itself).

use std::any::Any;
use std::cell::{Cell, OnceCell, RefCell};

use wasmi::core::Pages;
use wasmjs_abi::layout::PAGE_SIZE;

use crate::context::Scope;
use crate::script::{ByteStore, HostObject, JsResult, Object, Value};

/// Upper bound on pages for 32-bit memories.
pub const MAX_PAGES: u32 = 65536;

pub struct WasmMemory {
    initial: u32,
    maximum: Option<u32>,
    /// Page count while no native handle is attached.
    pages: Cell<u32>,
    handle: OnceCell<wasmi::Memory>,
    buffer: RefCell<Option<Object>>,
}

/// Read a page-count property; `None` when absent.
fn page_property(
    scope: &mut Scope<'_>,
    descriptor: &Value,
    key: &str,
) -> JsResult<Option<u32>> {
    let value = scope.get(descriptor, key)?;
    if value.is_undefined() {
        return Ok(None);
    }
    let Some(n) = value.as_number() else {
        return Err(scope.type_error(format!(
            "WebAssembly.Memory(): Property '{key}' must be convertible to a valid number"
        )));
    };
    if !n.is_finite() || n < 0.0 || n.trunc() > f64::from(MAX_PAGES) {
        return Err(scope.range_error(format!(
            "WebAssembly.Memory(): Property '{key}': value {n} is above the upper bound {MAX_PAGES}"
        )));
    }
    Ok(Some(n.trunc() as u32))
}

impl WasmMemory {
    /// Build from a `{initial, maximum?}` descriptor.
    pub fn from_descriptor(scope: &mut Scope<'_>, descriptor: &Value) -> JsResult<Self> {
        if descriptor.as_object().is_none() {
            return Err(scope.type_error("WebAssembly.Memory(): Argument 0 must be a memory descriptor"));
        }
        let Some(initial) = page_property(scope, descriptor, "initial")? else {
            return Err(scope.type_error("WebAssembly.Memory(): Property 'initial' is required"));
        };
        let maximum = page_property(scope, descriptor, "maximum")?;
        if let Some(max) = maximum {
            if max < initial {
                return Err(scope.range_error(format!(
                    "WebAssembly.Memory(): Property 'maximum': value {max} is below the lower bound {initial}"
                )));
            }
        }
        Ok(Self {
            initial,
            maximum,
            pages: Cell::new(initial),
            handle: OnceCell::new(),
            buffer: RefCell::new(None),
        })
    }

    /// Attach the native memory; later attaches are ignored.
    pub fn attach(&self, memory: wasmi::Memory) {
        if self.handle.set(memory).is_ok() {
            self.invalidate();
        }
    }

    pub fn native(&self) -> Option<wasmi::Memory> {
        self.handle.get().copied()
    }

    pub fn initial(&self) -> u32 {
        self.initial
    }

    pub fn maximum(&self) -> Option<u32> {
        self.maximum
    }

    pub fn current_pages(&self, scope: &Scope<'_>) -> u32 {
        match self.handle.get() {
            Some(memory) => u32::from(memory.current_pages(scope.store())),
            None => self.pages.get(),
        }
    }

    fn byte_len(&self, scope: &Scope<'_>) -> usize {
        match self.handle.get() {
            Some(memory) => memory.data(scope.store()).len(),
            None => self.pages.get() as usize * PAGE_SIZE as usize,
        }
    }

    /// Drop the memo and detach the buffer it held.
    fn invalidate(&self) -> Option<ByteStore> {
        let old = self.buffer.borrow_mut().take()?;
        old.array_buffer().map(|b| b.detach())
    }

    /// The `ArrayBuffer` over the current contents.
    pub fn buffer(&self, scope: &Scope<'_>) -> Object {
        let len = self.byte_len(scope);
        let stale = self
            .buffer
            .borrow()
            .as_ref()
            .and_then(Object::array_buffer)
            .is_some_and(|b| b.byte_len() != len);
        if stale {
            self.invalidate();
        }
        if let Some(buffer) = self.buffer.borrow().as_ref() {
            return buffer.clone();
        }
        let realm = scope.realm();
        let buffer = match self.handle.get() {
            Some(memory) => realm.new_linear_buffer(*memory, len),
            None => realm.new_array_buffer(vec![0; len]),
        };
        *self.buffer.borrow_mut() = Some(buffer.clone());
        buffer
    }

    /// Grow by `delta` pages, returning the previous page count.
    pub fn grow(&self, scope: &mut Scope<'_>, delta: u32) -> JsResult<u32> {
        let previous = self.current_pages(scope);
        let limit = self.maximum.unwrap_or(MAX_PAGES);
        let exceeded = || "WebAssembly.Memory.grow(): Maximum memory size exceeded";
        match previous.checked_add(delta) {
            Some(total) if total <= limit => {}
            _ => return Err(scope.range_error(exceeded())),
        }
        match self.handle.get() {
            Some(memory) => {
                let pages = Pages::new(delta).ok_or_else(|| scope.range_error(exceeded()))?;
                memory
                    .grow(scope.store_mut(), pages)
                    .map_err(|e| scope.range_error(format!("WebAssembly.Memory.grow(): {e}")))?;
                self.invalidate();
            }
            None => {
                self.pages.set(previous + delta);
                if let Some(ByteStore::Owned(mut bytes)) = self.invalidate() {
                    bytes.resize(self.byte_len(scope), 0);
                    *self.buffer.borrow_mut() = Some(scope.realm().new_array_buffer(bytes));
                }
            }
        }
        Ok(previous)
    }
}

impl HostObject for WasmMemory {
    fn class_name(&self) -> &'static str {
        "WebAssembly.Memory"
    }

    fn get(&self, scope: &mut Scope<'_>, key: &str) -> JsResult<Option<Value>> {
        Ok(match key {
            "buffer" => Some(self.buffer(scope).into()),
            _ => None,
        })
    }

    fn keys(&self) -> Vec<String> {
        vec!["buffer".to_string()]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `new WebAssembly.Memory(descriptor)`.
pub(crate) fn construct(scope: &mut Scope<'_>, _this: &Value, args: &[Value]) -> JsResult<Value> {
    let descriptor = args.first().cloned().unwrap_or_default();
    let memory = WasmMemory::from_descriptor(scope, &descriptor)?;
    Ok(instantiate(scope, memory).into())
}

fn instantiate(scope: &Scope<'_>, memory: WasmMemory) -> Object {
    let proto = scope.prototypes().memory.clone();
    scope.realm().new_host(memory, &proto)
}

/// Reflect an exported memory through the public constructor path.
pub(crate) fn wrap(scope: &mut Scope<'_>, native: wasmi::Memory) -> JsResult<Object> {
    let ty = native.ty(scope.store());
    let descriptor = scope.realm().new_object();
    descriptor.set_own("initial", i64::from(u32::from(ty.initial_pages())));
    if let Some(max) = ty.maximum_pages() {
        descriptor.set_own("maximum", i64::from(u32::from(max)));
    }
    let memory = WasmMemory::from_descriptor(scope, &descriptor.into())?;
    memory.attach(native);
    Ok(instantiate(scope, memory))
}

/// `Memory.prototype.grow(delta)`.
pub(crate) fn grow(scope: &mut Scope<'_>, this: &Value, args: &[Value]) -> JsResult<Value> {
    let Some(memory) = this.as_object().and_then(Object::host::<WasmMemory>) else {
        return Err(scope.type_error("WebAssembly.Memory.grow(): Receiver is not a WebAssembly.Memory"));
    };
    let delta = match args.first().and_then(Value::as_number) {
        Some(n) if n.is_finite() && n >= 0.0 && n <= f64::from(MAX_PAGES) => n.trunc() as u32,
        Some(_) => return Err(scope.range_error("WebAssembly.Memory.grow(): Argument 0 must be a valid page count")),
        None => return Err(scope.type_error("WebAssembly.Memory.grow(): Argument 0 must be convertible to a number")),
    };
    Ok(Value::from(i64::from(memory.grow(scope, delta)?)))
}
