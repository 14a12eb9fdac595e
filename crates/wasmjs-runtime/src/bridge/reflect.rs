//! Guarded property access on values received from the guest.
//!
//! Each operation has exactly two outcomes: the value, or a
//! [`ReflectError`] naming why this one operation failed.  Neither outcome
//! unwinds past the host import that asked.

use crate::context::Scope;
use crate::script::{Object, Thrown, Value};

pub(crate) enum ReflectError {
    /// The receiver was not an object.
    NotAnObject {
        op: &'static str,
        key: String,
        receiver: &'static str,
    },
    /// A host getter or setter threw.
    Thrown(Thrown),
}

impl From<Thrown> for ReflectError {
    fn from(thrown: Thrown) -> Self {
        ReflectError::Thrown(thrown)
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Undefined => "undefined",
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Integer(_) | Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Object(_) => "an object",
    }
}

fn receiver(op: &'static str, value: &Value, key: &str) -> Result<Object, ReflectError> {
    match value {
        Value::Object(o) => Ok(o.clone()),
        other => Err(ReflectError::NotAnObject {
            op,
            key: key.to_string(),
            receiver: describe(other),
        }),
    }
}

pub(crate) fn get(
    scope: &mut Scope<'_>,
    op: &'static str,
    target: &Value,
    key: &str,
) -> Result<Value, ReflectError> {
    let obj = receiver(op, target, key)?;
    Ok(obj.get(scope, key)?)
}

pub(crate) fn set(
    scope: &mut Scope<'_>,
    op: &'static str,
    target: &Value,
    key: &str,
    value: Value,
) -> Result<(), ReflectError> {
    let obj = receiver(op, target, key)?;
    Ok(obj.set(scope, key, value)?)
}

/// Delete `key`; a null receiver means the global object.
pub(crate) fn delete(scope: &mut Scope<'_>, target: &Value, key: &str) -> Result<(), ReflectError> {
    let obj = match target {
        Value::Null => scope.global(),
        other => receiver("valueDelete", other, key)?,
    };
    obj.delete(key);
    Ok(())
}
