//! Numeric kinds and the host-number coercion shared by export calls and
//! globals.

use std::fmt;

use wasmi::core::{ValType, F32, F64};
use wasmi::Val;

use crate::script::Value;

/// The four Wasm number types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericKind {
    I32,
    I64,
    F32,
    F64,
}

impl NumericKind {
    /// Parse a descriptor type name (`"i32"`, `"i64"`, `"f32"`, `"f64"`).
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "i32" => Some(NumericKind::I32),
            "i64" => Some(NumericKind::I64),
            "f32" => Some(NumericKind::F32),
            "f64" => Some(NumericKind::F64),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NumericKind::I32 => "i32",
            NumericKind::I64 => "i64",
            NumericKind::F32 => "f32",
            NumericKind::F64 => "f64",
        }
    }

    /// `None` for reference types.
    pub fn of(ty: ValType) -> Option<Self> {
        match ty {
            ValType::I32 => Some(NumericKind::I32),
            ValType::I64 => Some(NumericKind::I64),
            ValType::F32 => Some(NumericKind::F32),
            ValType::F64 => Some(NumericKind::F64),
            ValType::FuncRef | ValType::ExternRef => None,
        }
    }

    pub fn zero(self) -> Val {
        match self {
            NumericKind::I32 => Val::I32(0),
            NumericKind::I64 => Val::I64(0),
            NumericKind::F32 => Val::F32(F32::from_float(0.0)),
            NumericKind::F64 => Val::F64(F64::from_float(0.0)),
        }
    }

    /// Coerce a host number to this kind.  Integer-typed inputs convert
    /// exactly where the kind allows; floats follow `ToInt32` for i32 and
    /// truncate (saturating) for i64.  `None` if `value` is not a number.
    pub fn coerce(self, value: &Value) -> Option<Val> {
        let val = match (self, value) {
            (NumericKind::I32, Value::Integer(i)) => Val::I32(*i as i32),
            (NumericKind::I32, Value::Number(n)) => Val::I32(to_int32(*n)),
            (NumericKind::I64, Value::Integer(i)) => Val::I64(*i),
            (NumericKind::I64, Value::Number(n)) => Val::I64(*n as i64),
            (NumericKind::F32, _) => Val::F32(F32::from_float(value.as_number()? as f32)),
            (NumericKind::F64, _) => Val::F64(F64::from_float(value.as_number()?)),
            _ => return None,
        };
        Some(val)
    }
}

impl fmt::Display for NumericKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Script `ToInt32`: truncate, wrap modulo 2^32; NaN and infinities are 0.
pub fn to_int32(n: f64) -> i32 {
    if !n.is_finite() {
        return 0;
    }
    n.trunc().rem_euclid(4_294_967_296.0) as u32 as i32
}

/// Host value of a native result.  Integer kinds stay integer-typed.
pub fn to_value(val: &Val) -> Value {
    match val {
        Val::I32(i) => Value::Integer(i64::from(*i)),
        Val::I64(i) => Value::Integer(*i),
        Val::F32(f) => Value::Number(f64::from(f.to_float())),
        Val::F64(f) => Value::Number(f.to_float()),
        Val::FuncRef(r) if r.is_null() => Value::Null,
        Val::ExternRef(r) if r.is_null() => Value::Null,
        Val::FuncRef(_) | Val::ExternRef(_) => Value::Undefined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_int32_wraps() {
        assert_eq!(to_int32(3.9), 3);
        assert_eq!(to_int32(-3.9), -3);
        assert_eq!(to_int32(4_294_967_296.0 + 5.0), 5);
        assert_eq!(to_int32(2_147_483_648.0), i32::MIN);
        assert_eq!(to_int32(f64::NAN), 0);
    }

    #[test]
    fn coerce_rejects_non_numbers() {
        assert!(NumericKind::I32.coerce(&Value::from("3")).is_none());
        assert!(NumericKind::F64.coerce(&Value::Undefined).is_none());
        assert!(NumericKind::I64.coerce(&Value::Bool(true)).is_none());
    }

    #[test]
    fn coerce_accepts_both_number_types() {
        assert_eq!(NumericKind::I32.coerce(&Value::Integer(3)).and_then(|v| v.i32()), Some(3));
        assert_eq!(NumericKind::I32.coerce(&Value::Number(3.0)).and_then(|v| v.i32()), Some(3));
        assert_eq!(
            NumericKind::F64.coerce(&Value::Integer(2)).and_then(|v| v.f64()).map(F64::to_float),
            Some(2.0)
        );
    }
}
