//! Minimal `fs` and `process` globals.
//!
//! Go's `syscall` package routes stdout/stderr through `fs.write` and
//! queries `process` during startup.  These stand-ins are installed only
//! when the realm does not already define the globals: writes to fd 1 and 2
//! reach the context's stdio sink, everything else fails with `ENOSYS`.

use crate::context::Scope;
use crate::script::{ErrorKind, JsResult, Object, Realm, Value};

const CONSTANTS: &[&str] = &[
    "O_WRONLY",
    "O_RDWR",
    "O_CREAT",
    "O_TRUNC",
    "O_APPEND",
    "O_EXCL",
    "O_DIRECTORY",
];

/// File operations that always report `ENOSYS` through their callback.
const UNSUPPORTED_FS: &[&str] = &[
    "chmod", "chown", "close", "fchmod", "fchown", "fstat", "fsync", "ftruncate", "lchown",
    "link", "lstat", "mkdir", "open", "read", "readdir", "readlink", "rename", "rmdir", "stat",
    "symlink", "truncate", "unlink", "utimes",
];

fn enosys(realm: &Realm) -> Value {
    let error = realm.new_error(ErrorKind::Error, "not implemented");
    error.set_own("code", "ENOSYS");
    error.into()
}

fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or_default()
}

/// `fs.writeSync(fd, buf)`.
fn write_sync(scope: &mut Scope<'_>, args: &[Value]) -> JsResult<i64> {
    let fd = arg(args, 0).as_number().unwrap_or(-1.0) as i64;
    let bytes = arg(args, 1)
        .as_object()
        .and_then(|b| b.read_bytes(scope))
        .ok_or_else(|| scope.type_error("fs.writeSync: buffer must be a Uint8Array"))?;
    if !scope.state_mut().stdio.write(fd, &bytes) {
        return Err(crate::script::Thrown(enosys(&scope.realm())));
    }
    Ok(bytes.len() as i64)
}

fn install_fs(realm: &Realm) -> Object {
    let fs = realm.new_object();

    let constants = realm.new_object();
    for name in CONSTANTS {
        constants.set_own(name, Value::Integer(-1));
    }
    fs.set_own("constants", constants);

    fs.set_own(
        "writeSync",
        realm.new_function("writeSync", |scope, _, args| Ok(write_sync(scope, args)?.into())),
    );

    fs.set_own(
        "write",
        realm.new_function("write", |scope, _, args| {
            let callback = arg(args, 5);
            let length = arg(args, 3).as_number();
            let buffer_len = match arg(args, 1).as_object() {
                Some(b) => b.get(scope, "length")?.as_number(),
                None => None,
            };
            let whole_buffer = arg(args, 2).as_number() == Some(0.0)
                && length.is_some()
                && length == buffer_len
                && matches!(arg(args, 4), Value::Null);
            let outcome = if whole_buffer {
                write_sync(scope, &args[..2.min(args.len())])
            } else {
                Err(crate::script::Thrown(enosys(&scope.realm())))
            };
            let callback_args = match outcome {
                Ok(n) => vec![Value::Null, Value::Integer(n)],
                Err(thrown) => vec![thrown.0],
            };
            scope.call(&callback, &Value::Undefined, &callback_args)?;
            Ok(Value::Undefined)
        }),
    );

    for name in UNSUPPORTED_FS {
        fs.set_own(
            name,
            realm.new_function(name, |scope, _, args| {
                let callback = args.last().cloned().unwrap_or_default();
                let error = enosys(&scope.realm());
                scope.call(&callback, &Value::Undefined, &[error])?;
                Ok(Value::Undefined)
            }),
        );
    }
    fs
}

fn install_process(realm: &Realm) -> Object {
    let process = realm.new_object();
    for name in ["getuid", "getgid", "geteuid", "getegid"] {
        process.set_own(name, realm.new_function(name, |_, _, _| Ok(Value::Integer(-1))));
    }
    for name in ["getgroups", "umask", "cwd", "chdir"] {
        process.set_own(
            name,
            realm.new_function(name, |scope, _, _| {
                Err(crate::script::Thrown(enosys(&scope.realm())))
            }),
        );
    }
    process.set_own("pid", Value::Integer(-1));
    process.set_own("ppid", Value::Integer(-1));
    process
}

pub(crate) fn install(scope: &mut Scope<'_>) {
    let realm = scope.realm();
    let global = realm.global();
    if !global.has_own("fs") {
        global.set_own("fs", install_fs(&realm));
    }
    if !global.has_own("process") {
        global.set_own("process", install_process(&realm));
    }
}
