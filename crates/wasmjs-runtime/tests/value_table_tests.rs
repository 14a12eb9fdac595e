//! Integration tests for the value table.
//!
//! Tests validate:
//! - Reserved ids 0 through 6 and their type flags
//! - Identity: the same value always maps to the same id
//! - Plain numbers and undefined never occupy an id
//! - Unknown ids are reported, not invented

use wasmjs_abi::layout::{ID_BRIDGE, ID_FALSE, ID_GLOBAL, ID_NAN, ID_NULL, ID_TRUE, ID_ZERO, RESERVED_IDS};
use wasmjs_abi::{Slot, TypeFlag};
use wasmjs_runtime::{BridgeError, Object, Realm, Value, ValueTable};

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn table() -> (Realm, ValueTable) {
    let realm = Realm::new();
    let table = ValueTable::new(realm.global().clone(), realm.new_object());
    (realm, table)
}

fn reference(slot: Slot) -> (u32, TypeFlag) {
    match slot {
        Slot::Ref { id, flag } => (id, flag),
        other => panic!("expected a reference slot, got {other:?}"),
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Reserved ids
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_reserved_ids_are_seeded() {
    let (realm, mut table) = table();
    assert_eq!(table.len(), RESERVED_IDS as usize);

    assert_eq!(reference(table.store(&Value::Number(f64::NAN))), (ID_NAN, TypeFlag::Empty));
    assert_eq!(reference(table.store(&Value::Number(0.0))), (ID_ZERO, TypeFlag::Empty));
    assert_eq!(reference(table.store(&Value::Integer(0))), (ID_ZERO, TypeFlag::Empty));
    assert_eq!(reference(table.store(&Value::Null)), (ID_NULL, TypeFlag::Empty));
    assert_eq!(reference(table.store(&Value::Bool(true))), (ID_TRUE, TypeFlag::Empty));
    assert_eq!(reference(table.store(&Value::Bool(false))), (ID_FALSE, TypeFlag::Empty));
    assert_eq!(
        reference(table.store(&realm.global().clone().into())),
        (ID_GLOBAL, TypeFlag::Object)
    );
    assert_eq!(table.len(), RESERVED_IDS as usize);
}

#[test]
fn test_bridge_object_is_id_six() {
    let realm = Realm::new();
    let bridge = realm.new_object();
    let table = ValueTable::new(realm.global().clone(), bridge.clone());
    assert_eq!(table.id_of(&bridge.into()), Some(ID_BRIDGE));
}

#[test]
fn test_negative_zero_shares_the_zero_id() {
    let (_realm, mut table) = table();
    assert_eq!(reference(table.store(&Value::Number(-0.0))).0, ID_ZERO);
    match table.load(Slot::Ref { id: ID_ZERO, flag: TypeFlag::Empty }).unwrap() {
        Value::Number(n) => assert_eq!(n, 0.0),
        other => panic!("expected zero, got {other:?}"),
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Identity
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_new_values_get_sequential_ids() {
    let (realm, mut table) = table();
    let first = reference(table.store(&Value::from("a")));
    let second = reference(table.store(&realm.new_object().into()));
    let third = reference(table.store(&realm.new_function("f", |_, _, _| Ok(Value::Undefined)).into()));
    assert_eq!(first, (7, TypeFlag::String));
    assert_eq!(second, (8, TypeFlag::Object));
    assert_eq!(third, (9, TypeFlag::Function));
}

#[test]
fn test_same_value_keeps_its_id() {
    let (realm, mut table) = table();
    let obj: Value = realm.new_object().into();
    let a = table.store(&obj);
    let b = table.store(&obj.clone());
    assert_eq!(a, b);

    // Equal strings are the same value regardless of allocation.
    let s1 = table.store(&Value::from(String::from("key")));
    let s2 = table.store(&Value::from("key"));
    assert_eq!(s1, s2);
    assert_eq!(table.len(), RESERVED_IDS as usize + 2);
}

#[test]
fn test_distinct_objects_get_distinct_ids() {
    let (realm, mut table) = table();
    let a = reference(table.store(&realm.new_object().into())).0;
    let b = reference(table.store(&realm.new_object().into())).0;
    assert_ne!(a, b);
}

#[test]
fn test_load_returns_the_stored_object() {
    let (realm, mut table) = table();
    let obj = realm.new_array(vec![Value::from(1)]);
    let slot = table.store(&obj.clone().into());
    let loaded = table.load(slot).unwrap();
    assert!(loaded.as_object().is_some_and(|o| Object::ptr_eq(o, &obj)));
}

// ══════════════════════════════════════════════════════════════════════════════
// Numbers and undefined
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_numbers_are_not_interned() {
    let (_realm, mut table) = table();
    assert_eq!(table.store(&Value::Number(3.5)), Slot::Number(3.5));
    assert_eq!(table.store(&Value::Integer(-12)), Slot::Number(-12.0));
    assert_eq!(table.store(&Value::Undefined), Slot::Undefined);
    assert_eq!(table.len(), RESERVED_IDS as usize);
}

#[test]
fn test_number_round_trip() {
    let (_realm, table) = table();
    for n in [1.0, -2.5, 1e300, f64::INFINITY] {
        match table.load(Slot::Number(n)).unwrap() {
            Value::Number(m) => assert_eq!(m, n),
            other => panic!("expected {n}, got {other:?}"),
        }
    }
    assert!(table.load(Slot::Undefined).unwrap().is_undefined());
}

#[test]
fn test_unknown_id_is_an_error() {
    let (_realm, table) = table();
    let err = table
        .load(Slot::Ref { id: 99, flag: TypeFlag::Object })
        .unwrap_err();
    assert!(matches!(err, BridgeError::UnknownValue(99)));
}
