//! Per-call access to a bridge's memory and value table.

use wasmi::{AsContextMut, Caller, Memory};
use wasmjs_abi::{AbiResult, MemoryView, MemoryViewMut};

use super::reflect::ReflectError;
use super::BridgeId;
use crate::context::{HostState, Scope};
use crate::error::BridgeError;
use crate::script::{JsResult, Value};

fn abi<T>(result: AbiResult<T>) -> Result<T, wasmi::Error> {
    result.map_err(|e| BridgeError::from(e).into())
}

/// The host side of one import invocation.
///
/// Every accessor re-fetches the memory's byte buffer from the store, so
/// growth caused by an earlier reentrant call is always observed.
pub(crate) struct Syscall<'a, 'c> {
    caller: &'a mut Caller<'c, HostState>,
    bridge: BridgeId,
}

impl<'a, 'c> Syscall<'a, 'c> {
    pub fn new(caller: &'a mut Caller<'c, HostState>, bridge: BridgeId) -> Self {
        Self { caller, bridge }
    }

    pub fn state(&self) -> &HostState {
        self.caller.data()
    }

    pub fn state_mut(&mut self) -> &mut HostState {
        self.caller.data_mut()
    }

    pub fn bridge(&self) -> BridgeId {
        self.bridge
    }

    fn memory(&self) -> Result<Memory, BridgeError> {
        let state = self.state().bridge(self.bridge)?;
        if let Some(code) = state.exit_code {
            return Err(BridgeError::Exited(code));
        }
        state.memory.ok_or(BridgeError::NotRunning)
    }

    pub fn view(&self) -> Result<MemoryView<'_>, wasmi::Error> {
        let memory = self.memory()?;
        Ok(MemoryView::new(memory.data(&*self.caller)))
    }

    /// Run `f` over a writable view together with the store data.
    pub fn with_memory<R>(
        &mut self,
        f: impl FnOnce(&mut MemoryViewMut<'_>, &mut HostState) -> AbiResult<R>,
    ) -> Result<R, wasmi::Error> {
        let memory = self.memory()?;
        let (bytes, state) = memory.data_and_store_mut(&mut *self.caller);
        abi(f(&mut MemoryViewMut::new(bytes), state))
    }

    // ── Raw words ───────────────────────────────────────────────────────────

    pub fn i32(&self, addr: u64) -> Result<i32, wasmi::Error> {
        abi(self.view()?.i32(addr))
    }

    pub fn i64(&self, addr: u64) -> Result<i64, wasmi::Error> {
        abi(self.view()?.i64(addr))
    }

    pub fn set_u8(&mut self, addr: u64, value: u8) -> Result<(), wasmi::Error> {
        self.with_memory(|mem, _| mem.set_u8(addr, value))
    }

    pub fn set_i32(&mut self, addr: u64, value: i32) -> Result<(), wasmi::Error> {
        self.with_memory(|mem, _| mem.set_i32(addr, value))
    }

    pub fn set_i64(&mut self, addr: u64, value: i64) -> Result<(), wasmi::Error> {
        self.with_memory(|mem, _| mem.set_i64(addr, value))
    }

    // ── Strings and slices ──────────────────────────────────────────────────

    pub fn load_string(&self, addr: u64) -> Result<String, wasmi::Error> {
        abi(self.view()?.string(addr).map(|s| s.into_owned()))
    }

    /// Copy of the bytes described by the slice header at `addr`.
    pub fn load_bytes(&self, addr: u64) -> Result<Vec<u8>, wasmi::Error> {
        abi(self.view()?.slice(addr).map(<[u8]>::to_vec))
    }

    /// Copy `src` into the slice described by the header at `addr`,
    /// truncating to the shorter of the two; returns bytes copied.
    pub fn store_bytes(&mut self, addr: u64, src: &[u8]) -> Result<usize, wasmi::Error> {
        self.with_memory(|mem, _| {
            let dst = mem.slice_mut(addr)?;
            let n = dst.len().min(src.len());
            dst[..n].copy_from_slice(&src[..n]);
            Ok(n)
        })
    }

    // ── Values ──────────────────────────────────────────────────────────────

    pub fn load(&self, addr: u64) -> Result<Value, wasmi::Error> {
        let slot = abi(self.view()?.slot(addr))?;
        Ok(self.state().bridge(self.bridge)?.table.load(slot)?)
    }

    pub fn load_values(&self, addr: u64) -> Result<Vec<Value>, wasmi::Error> {
        let slots = abi(self.view()?.slots(addr))?;
        let table = &self.state().bridge(self.bridge)?.table;
        slots
            .into_iter()
            .map(|slot| table.load(slot).map_err(wasmi::Error::from))
            .collect()
    }

    pub fn store(&mut self, addr: u64, value: &Value) -> Result<(), wasmi::Error> {
        let bridge = self.bridge;
        let memory = self.memory()?;
        let (bytes, state) = memory.data_and_store_mut(&mut *self.caller);
        let slot = state.bridge_mut(bridge)?.table.store(value);
        abi(MemoryViewMut::new(bytes).set_slot(addr, slot))
    }

    /// Write a `(value, ok)` pair: the result with `ok = 1`, or the thrown
    /// value with `ok = 0`.
    pub fn store_outcome(
        &mut self,
        value_addr: u64,
        ok_addr: u64,
        outcome: JsResult<Value>,
    ) -> Result<(), wasmi::Error> {
        let (value, ok) = match outcome {
            Ok(v) => (v, 1),
            Err(thrown) => (thrown.0, 0),
        };
        self.store(value_addr, &value)?;
        self.set_u8(ok_addr, ok)
    }

    // ── Reentrancy ──────────────────────────────────────────────────────────

    /// Script scope over the caller's store.
    pub fn scope(&mut self) -> Scope<'_> {
        Scope::new(self.caller.as_context_mut())
    }

    /// Current guest stack pointer, via the `getsp` export.
    pub fn getsp(&mut self) -> Result<i32, wasmi::Error> {
        let getsp = self
            .state()
            .bridge(self.bridge)?
            .getsp
            .ok_or(BridgeError::NotRunning)?;
        getsp.call(&mut *self.caller, ())
    }

    /// Convert a failed property operation into a host error.
    pub fn fail(&mut self, error: ReflectError) -> wasmi::Error {
        match error {
            ReflectError::NotAnObject { op, key, receiver } => {
                BridgeError::NotAnObject { op, key, receiver }.into()
            }
            ReflectError::Thrown(thrown) => self.scope().park_exception(thrown).into(),
        }
    }

    /// Park a script exception and return the host error carrying it.
    pub fn raise(&mut self, thrown: crate::script::Thrown) -> wasmi::Error {
        self.scope().park_exception(thrown).into()
    }
}
