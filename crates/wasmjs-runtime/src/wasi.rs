//! Fallback imports for modules instantiated without an import source.
//!
//! Only the handful of `wasi_snapshot_preview1` calls a plain program
//! needs to print and exit are serviced; every other WASI function is
//! linked but answers `ENOSYS`.  The program sees a single argument, the
//! module's declared name (or `main`), and an empty environment.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::RngCore;
use wasmi::{Caller, Extern, ExternType, Linker, Val};
use wasmjs_abi::{AbiError, MemoryViewMut};

use crate::context::{HostState, Scope};
use crate::webassembly::WasmModule;

const WASI_MODULES: [&str; 2] = ["wasi_snapshot_preview1", "wasi_unstable"];

pub const ERRNO_SUCCESS: i32 = 0;
pub const ERRNO_BADF: i32 = 8;
pub const ERRNO_FAULT: i32 = 21;
pub const ERRNO_INVAL: i32 = 28;
pub const ERRNO_NOSYS: i32 = 52;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WasiCall {
    FdWrite,
    ProcExit,
    RandomGet,
    ClockTimeGet,
    ArgsSizesGet,
    ArgsGet,
    EnvironSizesGet,
    EnvironGet,
    SchedYield,
    Unsupported,
}

impl WasiCall {
    fn from_name(name: &str) -> Self {
        match name {
            "fd_write" => WasiCall::FdWrite,
            "proc_exit" => WasiCall::ProcExit,
            "random_get" => WasiCall::RandomGet,
            "clock_time_get" => WasiCall::ClockTimeGet,
            "args_sizes_get" => WasiCall::ArgsSizesGet,
            "args_get" => WasiCall::ArgsGet,
            "environ_sizes_get" => WasiCall::EnvironSizesGet,
            "environ_get" => WasiCall::EnvironGet,
            "sched_yield" => WasiCall::SchedYield,
            _ => WasiCall::Unsupported,
        }
    }
}

/// A linker defining every WASI function `module` imports.
pub(crate) fn linker(
    scope: &mut Scope<'_>,
    module: &WasmModule,
) -> Result<Linker<HostState>, wasmi::Error> {
    let program = module.name().unwrap_or("main").to_string();
    let mut linker = Linker::new(scope.store().engine());
    for import in module.native().imports() {
        if !WASI_MODULES.contains(&import.module()) {
            continue;
        }
        let ExternType::Func(ty) = import.ty() else {
            continue;
        };
        let call = WasiCall::from_name(import.name());
        if call == WasiCall::Unsupported {
            tracing::warn!(import = import.name(), "unsupported wasi import answers ENOSYS");
        }
        let name = import.name().to_string();
        let program = program.clone();
        linker.func_new(
            import.module(),
            import.name(),
            ty.clone(),
            move |mut caller, params, results| {
                tracing::trace!(call = %name, "wasi");
                let errno = dispatch(&mut caller, call, &program, params)?;
                if let Some(slot) = results.first_mut() {
                    *slot = Val::I32(errno);
                }
                Ok(())
            },
        )?;
    }
    Ok(linker)
}

fn arg_i32(params: &[Val], index: usize) -> i32 {
    match params.get(index) {
        Some(Val::I32(v)) => *v,
        _ => 0,
    }
}

fn arg_u64(params: &[Val], index: usize) -> u64 {
    match params.get(index) {
        Some(Val::I32(v)) => u64::from(*v as u32),
        Some(Val::I64(v)) => *v as u64,
        _ => 0,
    }
}

/// Run `f` over the exported `memory` and the host state.
fn with_memory<R>(
    caller: &mut Caller<'_, HostState>,
    f: impl FnOnce(&mut MemoryViewMut<'_>, &mut HostState) -> Result<R, AbiError>,
) -> Result<R, i32> {
    let Some(memory) = caller.get_export("memory").and_then(Extern::into_memory) else {
        tracing::warn!("wasi call without an exported `memory`");
        return Err(ERRNO_FAULT);
    };
    let (bytes, state) = memory.data_and_store_mut(&mut *caller);
    f(&mut MemoryViewMut::new(bytes), state).map_err(|e| {
        tracing::debug!(error = %e, "wasi memory access failed");
        ERRNO_FAULT
    })
}

fn errno<R>(outcome: Result<R, i32>) -> i32 {
    match outcome {
        Ok(_) => ERRNO_SUCCESS,
        Err(code) => code,
    }
}

fn dispatch(
    caller: &mut Caller<'_, HostState>,
    call: WasiCall,
    program: &str,
    params: &[Val],
) -> Result<i32, wasmi::Error> {
    let errno = match call {
        WasiCall::FdWrite => fd_write(caller, params),
        WasiCall::ProcExit => return Err(proc_exit(caller, arg_i32(params, 0))),
        WasiCall::RandomGet => {
            let (buf, len) = (arg_u64(params, 0), arg_u64(params, 1));
            errno(with_memory(caller, |mem, _| {
                rand::rng().fill_bytes(mem.bytes_mut(buf, len)?);
                Ok(())
            }))
        }
        WasiCall::ClockTimeGet => {
            let id = arg_i32(params, 0);
            let out = arg_u64(params, 2);
            errno(with_memory(caller, |mem, state| {
                let nanos = if id == 0 {
                    SystemTime::now()
                        .duration_since(UNIX_EPOCH)
                        .map_or(0, |d| d.as_nanos() as u64)
                } else {
                    state.uptime().as_nanos() as u64
                };
                mem.set_u64(out, nanos)
            }))
        }
        WasiCall::ArgsSizesGet => {
            let (argc_out, size_out) = (arg_u64(params, 0), arg_u64(params, 1));
            errno(with_memory(caller, |mem, _| {
                mem.set_u32(argc_out, 1)?;
                mem.set_u32(size_out, program.len() as u32 + 1)
            }))
        }
        WasiCall::ArgsGet => {
            let (argv, buf) = (arg_u64(params, 0), arg_u64(params, 1));
            errno(with_memory(caller, |mem, _| {
                mem.write_bytes(buf, program.as_bytes())?;
                mem.set_u8(buf + program.len() as u64, 0)?;
                mem.set_u32(argv, buf as u32)
            }))
        }
        WasiCall::EnvironSizesGet => {
            let (count_out, size_out) = (arg_u64(params, 0), arg_u64(params, 1));
            errno(with_memory(caller, |mem, _| {
                mem.set_u32(count_out, 0)?;
                mem.set_u32(size_out, 0)
            }))
        }
        WasiCall::EnvironGet | WasiCall::SchedYield => ERRNO_SUCCESS,
        WasiCall::Unsupported => ERRNO_NOSYS,
    };
    Ok(errno)
}

/// `fd_write(fd, iovs, iovs_len, nwritten)`: gathers the iovecs and
/// writes them to stdout or stderr.
fn fd_write(caller: &mut Caller<'_, HostState>, params: &[Val]) -> i32 {
    let fd = arg_i32(params, 0);
    let iovs = arg_u64(params, 1);
    let count = arg_u64(params, 2);
    let nwritten = arg_u64(params, 3);
    if fd != 1 && fd != 2 {
        return ERRNO_BADF;
    }
    let outcome = with_memory(caller, |mem, state| {
        let mut gathered = Vec::new();
        {
            let view = mem.view();
            for i in 0..count {
                let ptr = view.u32(iovs + i * 8)?;
                let len = view.u32(iovs + i * 8 + 4)?;
                gathered.extend_from_slice(view.bytes(u64::from(ptr), u64::from(len))?);
            }
        }
        let written = state.stdio.write(i64::from(fd), &gathered);
        mem.set_u32(nwritten, gathered.len() as u32)?;
        Ok(written)
    });
    match outcome {
        Ok(true) => ERRNO_SUCCESS,
        Ok(false) => ERRNO_INVAL,
        Err(code) => code,
    }
}

/// `proc_exit(code)`, with the same process policy as the bridge's exit.
fn proc_exit(caller: &mut Caller<'_, HostState>, code: i32) -> wasmi::Error {
    tracing::debug!(code, "wasi program exited");
    let state = caller.data();
    if state.config().exit_process {
        state.stdio.flush();
        std::process::exit(code);
    }
    wasmi::Error::i32_exit(code)
}
