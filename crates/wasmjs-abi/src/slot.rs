//! The 8-byte value slot codec.
//!
//! A slot is either a plain number, `undefined`, or a reference into the
//! host's value table boxed inside a quiet NaN:
//!
//! ```text
//! bits 63..32 : NAN_HEAD | type flag
//! bits 31..0  : value-table id
//! ```
//!
//! Zero and NaN are never written as raw numbers.  They live in the value
//! table at reserved ids so that the all-zero pattern can mean `undefined`.

use crate::layout::{ID_NAN, ID_ZERO};

/// High word shared by every boxed reference.
pub const NAN_HEAD: u32 = 0x7FF8_0000;

/// Mask selecting the type flag from the high word.
const FLAG_MASK: u32 = 0b111;

/// Type tag carried next to a boxed id, used by the guest to answer
/// `typeof` without calling back into the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum TypeFlag {
    /// Numbers, booleans, null and anything without a more specific tag.
    Empty = 0,
    Object = 1,
    String = 2,
    Symbol = 3,
    Function = 4,
}

impl TypeFlag {
    /// Decode the flag bits of a high word; unknown patterns map to `Empty`.
    pub fn from_bits(bits: u32) -> Self {
        match bits & FLAG_MASK {
            1 => TypeFlag::Object,
            2 => TypeFlag::String,
            3 => TypeFlag::Symbol,
            4 => TypeFlag::Function,
            _ => TypeFlag::Empty,
        }
    }
}

/// A decoded value slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Slot {
    /// The all-zero pattern.
    Undefined,
    /// A finite or infinite, non-zero, non-NaN number.
    Number(f64),
    /// A value-table reference.
    Ref { id: u32, flag: TypeFlag },
}

impl Slot {
    /// Slot for a host number, routing zero and NaN to their reserved ids.
    pub fn number(n: f64) -> Self {
        if n.is_nan() {
            Slot::Ref {
                id: ID_NAN,
                flag: TypeFlag::Empty,
            }
        } else if n == 0.0 {
            Slot::Ref {
                id: ID_ZERO,
                flag: TypeFlag::Empty,
            }
        } else {
            Slot::Number(n)
        }
    }

    pub fn encode(self) -> u64 {
        match self {
            Slot::Undefined => 0,
            Slot::Number(n) => n.to_bits(),
            Slot::Ref { id, flag } => (u64::from(NAN_HEAD | flag as u32) << 32) | u64::from(id),
        }
    }

    pub fn decode(bits: u64) -> Self {
        if bits == 0 {
            return Slot::Undefined;
        }
        let n = f64::from_bits(bits);
        if !n.is_nan() {
            return Slot::Number(n);
        }
        Slot::Ref {
            id: bits as u32,
            flag: TypeFlag::from_bits((bits >> 32) as u32),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ref_layout_matches_protocol() {
        let bits = Slot::Ref {
            id: 9,
            flag: TypeFlag::Function,
        }
        .encode();
        assert_eq!(bits, 0x7FF8_0004_0000_0009);
    }

    #[test]
    fn negative_zero_uses_zero_id() {
        assert_eq!(
            Slot::number(-0.0),
            Slot::Ref {
                id: ID_ZERO,
                flag: TypeFlag::Empty
            }
        );
    }
}
