//! Integration tests for the bridge ABI.
//!
//! Tests validate:
//! - Slot codec: raw numbers, undefined, boxed references, reserved ids
//! - Memory accessor: little-endian words, slices, strings, slot arrays
//! - Bounds violations are reported, never panicking
//! - Bootstrap argv/env block layout and its size limit

use wasmjs_abi::layout::{ARGV_BASE, ARGV_LIMIT, ID_NAN, ID_ZERO};
use wasmjs_abi::slot::NAN_HEAD;
use wasmjs_abi::{write_argv_block, AbiError, MemoryView, MemoryViewMut, Slot, TypeFlag};

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

/// One 64 KiB page of zeroed memory.
fn page() -> Vec<u8> {
    vec![0u8; 65536]
}

/// Write a `(ptr, len)` slice header at `addr`.
fn put_header(mem: &mut MemoryViewMut<'_>, addr: u64, ptr: i64, len: i64) {
    mem.set_i64(addr, ptr).unwrap();
    mem.set_i64(addr + 8, len).unwrap();
}

// ══════════════════════════════════════════════════════════════════════════════
// Slot codec
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_slot_undefined_is_all_zero() {
    assert_eq!(Slot::Undefined.encode(), 0);
    assert_eq!(Slot::decode(0), Slot::Undefined);
}

#[test]
fn test_slot_plain_numbers_are_raw_bits() {
    for n in [1.0, -1.5, 3.25e300, f64::INFINITY, f64::NEG_INFINITY, f64::MIN_POSITIVE] {
        let bits = Slot::number(n).encode();
        assert_eq!(bits, n.to_bits());
        assert_eq!(Slot::decode(bits), Slot::Number(n));
    }
}

#[test]
fn test_slot_zero_and_nan_use_reserved_ids() {
    let zero = Slot::number(0.0).encode();
    assert_eq!(zero >> 32, u64::from(NAN_HEAD));
    assert_eq!(zero as u32, ID_ZERO);

    let nan = Slot::number(f64::NAN).encode();
    assert_eq!(nan, u64::from(NAN_HEAD) << 32 | u64::from(ID_NAN));
    assert_eq!(
        Slot::decode(nan),
        Slot::Ref {
            id: ID_NAN,
            flag: TypeFlag::Empty
        }
    );
}

#[test]
fn test_slot_reference_flags() {
    for flag in [
        TypeFlag::Empty,
        TypeFlag::Object,
        TypeFlag::String,
        TypeFlag::Symbol,
        TypeFlag::Function,
    ] {
        let bits = Slot::Ref { id: 42, flag }.encode();
        assert_eq!((bits >> 32) as u32 & !0b111, NAN_HEAD);
        assert_eq!(Slot::decode(bits), Slot::Ref { id: 42, flag });
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Memory accessor
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_memory_words_are_little_endian() {
    let mut buf = page();
    let mut mem = MemoryViewMut::new(&mut buf);
    mem.set_u32(16, 0x0102_0304).unwrap();
    assert_eq!(mem.view().bytes(16, 4).unwrap(), &[4, 3, 2, 1]);
    mem.set_u8(20, 0xFF).unwrap();
    assert_eq!(mem.view().u8(20).unwrap(), 0xFF);
}

#[test]
fn test_memory_negative_i64_round_trips() {
    let mut buf = page();
    let mut mem = MemoryViewMut::new(&mut buf);
    mem.set_i64(8, -5).unwrap();
    assert_eq!(mem.view().i64(8).unwrap(), -5);
    mem.set_i64(8, i64::MIN).unwrap();
    assert_eq!(mem.view().i64(8).unwrap(), i64::MIN);
    mem.set_u64(8, u64::MAX - 1).unwrap();
    assert_eq!(mem.view().u64(8).unwrap(), u64::MAX - 1);
}

#[test]
fn test_memory_string_and_slice() {
    let mut buf = page();
    let mut mem = MemoryViewMut::new(&mut buf);
    mem.write_bytes(1024, b"hello").unwrap();
    put_header(&mut mem, 64, 1024, 5);
    let view = mem.view();
    assert_eq!(view.slice(64).unwrap(), b"hello");
    assert_eq!(view.string(64).unwrap(), "hello");
}

#[test]
fn test_memory_slice_mut_writes_through() {
    let mut buf = page();
    let mut mem = MemoryViewMut::new(&mut buf);
    put_header(&mut mem, 0, 256, 3);
    mem.slice_mut(0).unwrap().copy_from_slice(&[7, 8, 9]);
    assert_eq!(mem.view().bytes(256, 3).unwrap(), &[7, 8, 9]);
}

#[test]
fn test_memory_slot_array() {
    let mut buf = page();
    let mut mem = MemoryViewMut::new(&mut buf);
    mem.set_slot(512, Slot::Number(2.5)).unwrap();
    mem.set_slot(520, Slot::Undefined).unwrap();
    mem.set_slot(
        528,
        Slot::Ref {
            id: 8,
            flag: TypeFlag::String,
        },
    )
    .unwrap();
    put_header(&mut mem, 32, 512, 3);
    let slots = mem.view().slots(32).unwrap();
    assert_eq!(
        slots,
        vec![
            Slot::Number(2.5),
            Slot::Undefined,
            Slot::Ref {
                id: 8,
                flag: TypeFlag::String
            }
        ]
    );
}

#[test]
fn test_memory_out_of_bounds_is_an_error() {
    let buf = vec![0u8; 16];
    let view = MemoryView::new(&buf);
    assert!(matches!(
        view.u64(12),
        Err(AbiError::OutOfBounds { addr: 12, len: 8, size: 16 })
    ));
    assert!(view.bytes(u64::MAX, 2).is_err());
    assert!(view.u8(16).is_err());
    assert!(view.u8(15).is_ok());
}

#[test]
fn test_memory_negative_slice_header_is_rejected() {
    let mut buf = page();
    let mut mem = MemoryViewMut::new(&mut buf);
    put_header(&mut mem, 0, -1, 4);
    assert!(mem.view().slice(0).is_err());
    put_header(&mut mem, 0, 0, -4);
    assert!(mem.view().slots(0).is_err());
}

// ══════════════════════════════════════════════════════════════════════════════
// Bootstrap block
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_argv_block_default_layout() {
    let mut buf = page();
    let mut mem = MemoryViewMut::new(&mut buf);
    let block = write_argv_block(&mut mem, &["js".to_string()], &[]).unwrap();

    assert_eq!(block.argc, 1);
    assert_eq!(block.argv, 4104);
    assert_eq!(block.end, 4104 + 24);

    let view = mem.view();
    assert_eq!(view.bytes(u64::from(ARGV_BASE), 3).unwrap(), b"js\0");
    assert_eq!(view.u64(4104).unwrap(), u64::from(ARGV_BASE));
    assert_eq!(view.u64(4112).unwrap(), 0);
    assert_eq!(view.u64(4120).unwrap(), 0);
}

#[test]
fn test_argv_block_with_env() {
    let mut buf = page();
    let mut mem = MemoryViewMut::new(&mut buf);
    let argv = vec!["prog".to_string(), "-v".to_string()];
    let env = vec!["HOME=/root".to_string()];
    let block = write_argv_block(&mut mem, &argv, &env).unwrap();

    assert_eq!(block.argc, 2);
    let view = mem.view();
    let argv0 = view.u64(block.argv as u64).unwrap();
    let argv1 = view.u64(block.argv as u64 + 8).unwrap();
    assert_eq!(view.bytes(argv0, 5).unwrap(), b"prog\0");
    assert_eq!(view.bytes(argv1, 3).unwrap(), b"-v\0");
    assert_eq!(argv0 % 8, 0);
    assert_eq!(argv1 % 8, 0);
    assert_eq!(view.u64(block.argv as u64 + 16).unwrap(), 0);
    let env0 = view.u64(block.argv as u64 + 24).unwrap();
    assert_eq!(view.bytes(env0, 11).unwrap(), b"HOME=/root\0");
    assert_eq!(view.u64(block.argv as u64 + 32).unwrap(), 0);
}

#[test]
fn test_argv_block_limit() {
    let mut buf = page();
    let mut mem = MemoryViewMut::new(&mut buf);
    let huge = vec!["x".repeat(9000)];
    match write_argv_block(&mut mem, &huge, &[]) {
        Err(AbiError::ArgvTooLarge { limit, .. }) => assert_eq!(limit, ARGV_LIMIT),
        other => panic!("expected ArgvTooLarge, got {other:?}"),
    }
}

#[test]
fn test_oversized_argv_block_writes_nothing() {
    let mut buf = page();
    let env: Vec<String> = (0..40).map(|i| format!("VAR{i}={}", "v".repeat(200))).collect();
    {
        let mut mem = MemoryViewMut::new(&mut buf);
        let result = write_argv_block(&mut mem, &["prog".to_string()], &env);
        assert!(matches!(result, Err(AbiError::ArgvTooLarge { .. })));
    }
    assert!(buf.iter().all(|&b| b == 0), "guest memory was modified");
}

#[test]
fn test_argv_block_rejects_interior_nul() {
    let mut buf = page();
    let mut mem = MemoryViewMut::new(&mut buf);
    let bad = vec!["a\0b".to_string()];
    assert!(matches!(
        write_argv_block(&mut mem, &bad, &[]),
        Err(AbiError::InteriorNul(_))
    ));
}
