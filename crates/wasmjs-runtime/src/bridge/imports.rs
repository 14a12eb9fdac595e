//! The host import namespace.
//!
//! Every import takes the guest stack pointer and nothing else.  Offsets
//! below are relative to `sp` and fixed by the Go `js/wasm` ABI; slices
//! are `(ptr, len, cap)` headers and values are 8-byte slots.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::RngCore;
use wasmi::{AsContextMut, Caller, Func};

use super::frame::Frame;
use super::reflect;
use super::syscall::Syscall;
use super::BridgeId;
use crate::context::HostState;
use crate::error::BridgeError;
use crate::script::Value;

type Handler = fn(&mut Syscall<'_, '_>, Frame) -> Result<(), wasmi::Error>;

/// Import names and their handlers.
pub(crate) const IMPORTS: &[(&str, Handler)] = &[
    ("debug", debug),
    ("runtime.resetMemoryDataView", reset_memory_data_view),
    ("runtime.wasmExit", wasm_exit),
    ("runtime.wasmWrite", wasm_write),
    ("runtime.nanotime1", nanotime1),
    ("runtime.walltime", walltime),
    ("runtime.scheduleTimeoutEvent", schedule_timeout_event),
    ("runtime.clearTimeoutEvent", clear_timeout_event),
    ("runtime.getRandomData", get_random_data),
    ("syscall/js.finalizeRef", finalize_ref),
    ("syscall/js.stringVal", string_val),
    ("syscall/js.valueGet", value_get),
    ("syscall/js.valueSet", value_set),
    ("syscall/js.valueDelete", value_delete),
    ("syscall/js.valueIndex", value_index),
    ("syscall/js.valueSetIndex", value_set_index),
    ("syscall/js.valueCall", value_call),
    ("syscall/js.valueInvoke", value_invoke),
    ("syscall/js.valueNew", value_new),
    ("syscall/js.valueLength", value_length),
    ("syscall/js.valuePrepareString", value_prepare_string),
    ("syscall/js.valueLoadString", value_load_string),
    ("syscall/js.valueInstanceOf", value_instance_of),
    ("syscall/js.copyBytesToGo", copy_bytes_to_go),
    ("syscall/js.copyBytesToJS", copy_bytes_to_js),
];

/// Create one host function per import, bound to `bridge`.
pub(crate) fn define(
    mut store: impl AsContextMut<Data = HostState>,
    bridge: BridgeId,
) -> Vec<(&'static str, Func)> {
    IMPORTS
        .iter()
        .map(|&(name, handler)| {
            let func = Func::wrap(
                &mut store,
                move |mut caller: Caller<'_, HostState>, sp: i32| -> Result<(), wasmi::Error> {
                    tracing::trace!(import = name, sp, "host call");
                    let mut sys = Syscall::new(&mut caller, bridge);
                    handler(&mut sys, Frame::enter(sp))
                },
            );
            (name, func)
        })
        .collect()
}

// ══════════════════════════════════════════════════════════════════════════════
// runtime.*
// ══════════════════════════════════════════════════════════════════════════════

/// Receives a raw value rather than a stack pointer.
fn debug(_sys: &mut Syscall<'_, '_>, frame: Frame) -> Result<(), wasmi::Error> {
    tracing::debug!(value = frame.raw(), "guest debug");
    Ok(())
}

fn reset_memory_data_view(_sys: &mut Syscall<'_, '_>, _frame: Frame) -> Result<(), wasmi::Error> {
    Ok(())
}

fn wasm_exit(sys: &mut Syscall<'_, '_>, frame: Frame) -> Result<(), wasmi::Error> {
    let code = sys.i32(frame.at(8))?;
    let bridge = sys.bridge();
    sys.state_mut().bridge_mut(bridge)?.exit_code = Some(code);
    tracing::debug!(code, "program exited");
    if sys.state().config().exit_process {
        sys.state().stdio.flush();
        std::process::exit(code);
    }
    Err(wasmi::Error::i32_exit(code))
}

fn wasm_write(sys: &mut Syscall<'_, '_>, frame: Frame) -> Result<(), wasmi::Error> {
    let fd = sys.i64(frame.at(8))?;
    let ptr = sys.i64(frame.at(16))?;
    let len = sys.i32(frame.at(24))?;
    sys.with_memory(|mem, state| {
        let bytes = mem.view().bytes(ptr as u64, u64::from(len as u32))?;
        state.stdio.write(fd, bytes);
        Ok(())
    })
}

fn nanotime1(sys: &mut Syscall<'_, '_>, frame: Frame) -> Result<(), wasmi::Error> {
    let nanos = sys.state().uptime().as_nanos() as i64;
    sys.set_i64(frame.at(8), nanos)
}

fn walltime(sys: &mut Syscall<'_, '_>, frame: Frame) -> Result<(), wasmi::Error> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    sys.set_i64(frame.at(8), now.as_secs() as i64)?;
    sys.set_i32(frame.at(16), now.subsec_nanos() as i32)
}

fn schedule_timeout_event(_sys: &mut Syscall<'_, '_>, _frame: Frame) -> Result<(), wasmi::Error> {
    tracing::trace!("timeout events are not scheduled");
    Ok(())
}

fn clear_timeout_event(_sys: &mut Syscall<'_, '_>, _frame: Frame) -> Result<(), wasmi::Error> {
    Ok(())
}

fn get_random_data(sys: &mut Syscall<'_, '_>, frame: Frame) -> Result<(), wasmi::Error> {
    sys.with_memory(|mem, _| {
        rand::rng().fill_bytes(mem.slice_mut(frame.at(8))?);
        Ok(())
    })
}

// ══════════════════════════════════════════════════════════════════════════════
// syscall/js.*
// ══════════════════════════════════════════════════════════════════════════════

fn finalize_ref(_sys: &mut Syscall<'_, '_>, _frame: Frame) -> Result<(), wasmi::Error> {
    Ok(())
}

fn string_val(sys: &mut Syscall<'_, '_>, frame: Frame) -> Result<(), wasmi::Error> {
    let s = sys.load_string(frame.at(8))?;
    sys.store(frame.at(24), &Value::from(s))
}

fn value_get(sys: &mut Syscall<'_, '_>, frame: Frame) -> Result<(), wasmi::Error> {
    let target = sys.load(frame.at(8))?;
    let key = sys.load_string(frame.at(16))?;
    let detached = frame.leave();
    let result = reflect::get(&mut sys.scope(), "valueGet", &target, &key);
    let value = result.map_err(|e| sys.fail(e))?;
    let frame = detached.reenter(sys)?;
    sys.store(frame.at(32), &value)
}

fn value_set(sys: &mut Syscall<'_, '_>, frame: Frame) -> Result<(), wasmi::Error> {
    let target = sys.load(frame.at(8))?;
    let key = sys.load_string(frame.at(16))?;
    let value = sys.load(frame.at(32))?;
    let result = reflect::set(&mut sys.scope(), "valueSet", &target, &key, value);
    result.map_err(|e| sys.fail(e))
}

fn value_delete(sys: &mut Syscall<'_, '_>, frame: Frame) -> Result<(), wasmi::Error> {
    let target = sys.load(frame.at(8))?;
    let key = sys.load_string(frame.at(16))?;
    let result = reflect::delete(&mut sys.scope(), &target, &key);
    result.map_err(|e| sys.fail(e))
}

fn value_index(sys: &mut Syscall<'_, '_>, frame: Frame) -> Result<(), wasmi::Error> {
    let target = sys.load(frame.at(8))?;
    let index = sys.i64(frame.at(16))?;
    let result = reflect::get(&mut sys.scope(), "valueIndex", &target, &index.to_string());
    let value = result.map_err(|e| sys.fail(e))?;
    sys.store(frame.at(24), &value)
}

fn value_set_index(sys: &mut Syscall<'_, '_>, frame: Frame) -> Result<(), wasmi::Error> {
    let target = sys.load(frame.at(8))?;
    let index = sys.i64(frame.at(16))?;
    let value = sys.load(frame.at(24))?;
    let result = reflect::set(
        &mut sys.scope(),
        "valueSetIndex",
        &target,
        &index.to_string(),
        value,
    );
    result.map_err(|e| sys.fail(e))
}

fn value_call(sys: &mut Syscall<'_, '_>, frame: Frame) -> Result<(), wasmi::Error> {
    let receiver = sys.load(frame.at(8))?;
    let method = sys.load_string(frame.at(16))?;
    let args = sys.load_values(frame.at(32))?;
    let detached = frame.leave();
    let outcome = sys.scope().call_method(&receiver, &method, &args);
    let frame = detached.reenter(sys)?;
    sys.store_outcome(frame.at(56), frame.at(64), outcome)
}

fn value_invoke(sys: &mut Syscall<'_, '_>, frame: Frame) -> Result<(), wasmi::Error> {
    let callee = sys.load(frame.at(8))?;
    let args = sys.load_values(frame.at(16))?;
    let detached = frame.leave();
    let outcome = sys.scope().call(&callee, &Value::Undefined, &args);
    let frame = detached.reenter(sys)?;
    sys.store_outcome(frame.at(40), frame.at(48), outcome)
}

fn value_new(sys: &mut Syscall<'_, '_>, frame: Frame) -> Result<(), wasmi::Error> {
    let ctor = sys.load(frame.at(8))?;
    let args = sys.load_values(frame.at(16))?;
    let detached = frame.leave();
    let outcome = sys.scope().construct(&ctor, &args);
    let frame = detached.reenter(sys)?;
    sys.store_outcome(frame.at(40), frame.at(48), outcome)
}

fn value_length(sys: &mut Syscall<'_, '_>, frame: Frame) -> Result<(), wasmi::Error> {
    let target = sys.load(frame.at(8))?;
    match target {
        Value::Undefined => return Err(BridgeError::NoLength("undefined").into()),
        Value::Null => return Err(BridgeError::NoLength("null").into()),
        _ => {}
    }
    let length = sys.scope().get(&target, "length");
    let length = length.map_err(|thrown| sys.raise(thrown))?;
    let n = length.as_number().filter(|n| n.is_finite()).unwrap_or(0.0);
    sys.set_i64(frame.at(16), n as i64)
}

fn value_prepare_string(sys: &mut Syscall<'_, '_>, frame: Frame) -> Result<(), wasmi::Error> {
    let value = sys.load(frame.at(8))?;
    let bytes = value.to_display_string().into_bytes();
    let len = bytes.len() as i64;
    let array = sys.state().realm().new_uint8_array(bytes);
    sys.store(frame.at(16), &Value::from(array))?;
    sys.set_i64(frame.at(24), len)
}

fn value_load_string(sys: &mut Syscall<'_, '_>, frame: Frame) -> Result<(), wasmi::Error> {
    let source = sys.load(frame.at(8))?;
    let bytes = byte_source(sys, &source).ok_or(BridgeError::NotBytes("valueLoadString"))?;
    sys.store_bytes(frame.at(16), &bytes)?;
    Ok(())
}

fn value_instance_of(sys: &mut Syscall<'_, '_>, frame: Frame) -> Result<(), wasmi::Error> {
    let value = sys.load(frame.at(8))?;
    let ctor = sys.load(frame.at(16))?;
    let result = sys.scope().instance_of(&value, &ctor);
    let is_instance = result.map_err(|thrown| sys.raise(thrown))?;
    sys.set_u8(frame.at(24), u8::from(is_instance))
}

fn copy_bytes_to_go(sys: &mut Syscall<'_, '_>, frame: Frame) -> Result<(), wasmi::Error> {
    let source = sys.load(frame.at(32))?;
    let Some(bytes) = byte_source(sys, &source) else {
        return sys.set_u8(frame.at(48), 0);
    };
    let n = sys.store_bytes(frame.at(8), &bytes)?;
    sys.set_i64(frame.at(40), n as i64)?;
    sys.set_u8(frame.at(48), 1)
}

fn copy_bytes_to_js(sys: &mut Syscall<'_, '_>, frame: Frame) -> Result<(), wasmi::Error> {
    let target = sys.load(frame.at(8))?;
    let Some(dst) = target.as_object().filter(|o| o.uint8_array().is_some()) else {
        return sys.set_u8(frame.at(48), 0);
    };
    let src = sys.load_bytes(frame.at(32))?;
    let n = match dst.uint8_array() {
        Some(view) => view.copy_from(&mut sys.scope(), &src),
        None => 0,
    };
    sys.set_i64(frame.at(40), n as i64)?;
    sys.set_u8(frame.at(48), 1)
}

/// Bytes of a `Uint8Array` received from the guest.
fn byte_source(sys: &mut Syscall<'_, '_>, value: &Value) -> Option<Vec<u8>> {
    let view = value.as_object()?.uint8_array()?;
    Some(view.to_vec(&sys.scope()))
}
