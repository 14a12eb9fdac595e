//! The value table: script values <-> 32-bit ids boxed in value slots.
//!
//! Ids are handed out sequentially and never reclaimed; `finalizeRef` is
//! accepted but ignored, so a table only grows for the life of its bridge.

use std::collections::HashMap;
use std::rc::Rc;

use wasmjs_abi::layout::{ID_BRIDGE, ID_FALSE, ID_GLOBAL, ID_NAN, ID_NULL, ID_TRUE, ID_ZERO};
use wasmjs_abi::{Slot, TypeFlag};

use crate::error::BridgeError;
use crate::script::{Object, Value};

/// Lookup key for the inverse map.  Objects are keyed by identity; the
/// table keeps every stored object alive, so an address is never reused
/// while its entry exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ValueKey {
    Nan,
    Zero,
    Null,
    Bool(bool),
    String(Rc<str>),
    Object(usize),
}

impl ValueKey {
    /// `None` for values that never occupy an id (undefined, plain numbers).
    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Undefined => None,
            Value::Null => Some(ValueKey::Null),
            Value::Bool(b) => Some(ValueKey::Bool(*b)),
            Value::Integer(0) => Some(ValueKey::Zero),
            Value::Integer(_) => None,
            Value::Number(n) if n.is_nan() => Some(ValueKey::Nan),
            Value::Number(n) if *n == 0.0 => Some(ValueKey::Zero),
            Value::Number(_) => None,
            Value::String(s) => Some(ValueKey::String(s.clone())),
            Value::Object(o) => Some(ValueKey::Object(o.identity())),
        }
    }
}

fn type_flag(value: &Value) -> TypeFlag {
    match value {
        Value::Object(o) if o.is_callable() => TypeFlag::Function,
        Value::Object(_) => TypeFlag::Object,
        Value::String(_) => TypeFlag::String,
        _ => TypeFlag::Empty,
    }
}

pub struct ValueTable {
    values: Vec<Value>,
    ids: HashMap<ValueKey, u32>,
}

impl ValueTable {
    /// A table seeded with the reserved ids 0 through 6.
    pub fn new(global: Object, bridge: Object) -> Self {
        let seeded = [
            (ID_NAN, Value::Number(f64::NAN)),
            (ID_ZERO, Value::Number(0.0)),
            (ID_NULL, Value::Null),
            (ID_TRUE, Value::Bool(true)),
            (ID_FALSE, Value::Bool(false)),
            (ID_GLOBAL, Value::Object(global)),
            (ID_BRIDGE, Value::Object(bridge)),
        ];
        let mut table = Self {
            values: Vec::with_capacity(64),
            ids: HashMap::new(),
        };
        for (id, value) in seeded {
            debug_assert_eq!(id as usize, table.values.len());
            if let Some(key) = ValueKey::of(&value) {
                table.ids.insert(key, id);
            }
            table.values.push(value);
        }
        table
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, id: u32) -> Option<&Value> {
        self.values.get(id as usize)
    }

    /// The id already assigned to `value`, if any.
    pub fn id_of(&self, value: &Value) -> Option<u32> {
        ValueKey::of(value).and_then(|key| self.ids.get(&key).copied())
    }

    /// Encode `value`, assigning a fresh id on first sight.
    pub fn store(&mut self, value: &Value) -> Slot {
        let Some(key) = ValueKey::of(value) else {
            return value.as_number().map_or(Slot::Undefined, Slot::Number);
        };
        let values = &mut self.values;
        let id = *self.ids.entry(key).or_insert_with(|| {
            values.push(value.clone());
            (values.len() - 1) as u32
        });
        Slot::Ref {
            id,
            flag: type_flag(value),
        }
    }

    pub fn load(&self, slot: Slot) -> Result<Value, BridgeError> {
        match slot {
            Slot::Undefined => Ok(Value::Undefined),
            Slot::Number(n) => Ok(Value::Number(n)),
            Slot::Ref { id, .. } => self.get(id).cloned().ok_or(BridgeError::UnknownValue(id)),
        }
    }
}
