//! Attaching a bridge to an instance and starting the program.

use wasmi::TypedFunc;
use wasmjs_abi::layout::{EXPORT_GETSP, EXPORT_MEMORY, EXPORT_RESUME, EXPORT_RUN};
use wasmjs_abi::{write_argv_block, MemoryViewMut};

use super::BridgeId;
use crate::context::Scope;
use crate::error::{RuntimeError, RuntimeResult};

fn missing(name: &str) -> RuntimeError {
    RuntimeError::Bootstrap(format!("module has no usable `{name}` export"))
}

/// Resolve the memory, `getsp` and `resume` exports and record them on the
/// bridge.  After this the host imports of `bridge` are live.
pub fn attach(scope: &mut Scope<'_>, bridge: BridgeId, instance: &wasmi::Instance) -> RuntimeResult<()> {
    let memory = instance
        .get_memory(scope.store(), EXPORT_MEMORY)
        .ok_or_else(|| missing(EXPORT_MEMORY))?;
    let getsp = instance
        .get_typed_func::<(), i32>(scope.store(), EXPORT_GETSP)
        .map_err(|_| missing(EXPORT_GETSP))?;
    let resume = instance
        .get_typed_func::<(), ()>(scope.store(), EXPORT_RESUME)
        .map_err(|_| missing(EXPORT_RESUME))?;

    let state = scope
        .state_mut()
        .bridge_mut(bridge)
        .map_err(|e| RuntimeError::Bootstrap(e.to_string()))?;
    state.memory = Some(memory);
    state.getsp = Some(getsp);
    state.resume = Some(resume);
    state.exit_code = None;
    Ok(())
}

/// Run the program: attach, write the argv/env block, call `run(argc, argv)`.
///
/// Returns the exit code if the program called `runtime.wasmExit`, or
/// `None` if `run` returned with the program parked (waiting for events).
pub fn run(
    scope: &mut Scope<'_>,
    bridge: BridgeId,
    instance: &wasmi::Instance,
    extra_args: &[String],
) -> RuntimeResult<Option<i32>> {
    let entry: TypedFunc<(i32, i32), ()> = instance
        .get_typed_func(scope.store(), EXPORT_RUN)
        .map_err(|_| missing(EXPORT_RUN))?;
    attach(scope, bridge, instance)?;

    let config = scope.state().config();
    let mut argv = config.argv.clone();
    argv.extend_from_slice(extra_args);
    let env = config.env_strings();

    let memory = scope
        .state()
        .bridge(bridge)
        .ok()
        .and_then(|b| b.memory)
        .ok_or_else(|| missing(EXPORT_MEMORY))?;
    let block = write_argv_block(
        &mut MemoryViewMut::new(memory.data_mut(scope.store_mut())),
        &argv,
        &env,
    )?;
    tracing::debug!(argc = block.argc, argv = block.argv, end = block.end, "bootstrap block written");

    let result = entry.call(scope.store_mut(), (block.argc, block.argv));
    let exit_code = scope.state().bridge(bridge).ok().and_then(|b| b.exit_code);
    match result {
        Ok(()) => Ok(exit_code),
        Err(e) => match e.i32_exit_status().or(exit_code) {
            Some(code) => Ok(Some(code)),
            None => Err(RuntimeError::Engine(e)),
        },
    }
}
