//! Fixed names, reserved ids and offsets of the bridge protocol.

use crate::error::{AbiError, AbiResult};
use crate::memory::MemoryViewMut;

// ── Reserved value-table ids ─────────────────────────────────────────────────
// (seeded in this order when a bridge is created)

pub const ID_NAN: u32 = 0;
pub const ID_ZERO: u32 = 1;
pub const ID_NULL: u32 = 2;
pub const ID_TRUE: u32 = 3;
pub const ID_FALSE: u32 = 4;
pub const ID_GLOBAL: u32 = 5;
/// The per-bridge state object carrying `_pendingEvent`.
pub const ID_BRIDGE: u32 = 6;
/// Number of ids seeded before any guest value is stored.
pub const RESERVED_IDS: u32 = 7;

// ── Import modules ───────────────────────────────────────────────────────────

/// Import module used by current Go toolchains.
pub const IMPORT_MODULE: &str = "gojs";
/// Import module used by Go 1.20 and earlier.
pub const IMPORT_MODULE_LEGACY: &str = "go";

// ── Required exports ─────────────────────────────────────────────────────────

/// Linear memory.
pub const EXPORT_MEMORY: &str = "mem";
/// `getsp() -> i32`, the current stack pointer.
pub const EXPORT_GETSP: &str = "getsp";
/// `resume()`, continues a parked program to deliver a pending event.
pub const EXPORT_RESUME: &str = "resume";
/// `run(argc: i32, argv: i32)`, the program entry point.
pub const EXPORT_RUN: &str = "run";

// ── Linear memory ────────────────────────────────────────────────────────────

/// Bytes per Wasm page.
pub const PAGE_SIZE: u32 = 65536;

// ── Bootstrap layout ─────────────────────────────────────────────────────────

/// First byte of the argv/env block.
pub const ARGV_BASE: u32 = 4096;
/// The block must end strictly below this address.
pub const ARGV_LIMIT: u32 = ARGV_BASE + 8192;

/// Where the argv/env block landed in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgvBlock {
    /// Number of argv entries.
    pub argc: i32,
    /// Address of the argv pointer array.
    pub argv: i32,
    /// First free byte after the block.
    pub end: u32,
}

/// Write argv and env strings plus their pointer arrays at [`ARGV_BASE`].
///
/// Layout: every string NUL-terminated and padded to 8 bytes, then the argv
/// pointers followed by a zero word, then the env pointers followed by a
/// zero word.  Each pointer occupies an 8-byte slot.
pub fn write_argv_block(
    mem: &mut MemoryViewMut<'_>,
    argv: &[String],
    env: &[String],
) -> AbiResult<ArgvBlock> {
    let strings: Vec<&String> = argv.iter().chain(env).collect();
    if let Some(s) = strings.iter().find(|s| s.contains('\0')) {
        return Err(AbiError::InteriorNul(s.to_string()));
    }

    // Size the block first; nothing is written when it does not fit.
    let mut offset = u64::from(ARGV_BASE);
    let mut ptrs = Vec::with_capacity(strings.len());
    for s in &strings {
        ptrs.push(offset);
        offset = align8(offset + s.len() as u64 + 1);
    }
    let argv_addr = offset;
    let end = argv_addr + 8 * (strings.len() as u64 + 2);
    if end >= u64::from(ARGV_LIMIT) {
        return Err(AbiError::ArgvTooLarge {
            end,
            limit: ARGV_LIMIT,
        });
    }

    for (s, &ptr) in strings.iter().zip(&ptrs) {
        mem.write_bytes(ptr, s.as_bytes())?;
        mem.set_u8(ptr + s.len() as u64, 0)?;
    }
    let (argv_ptrs, env_ptrs) = ptrs.split_at(argv.len());
    let words = argv_ptrs
        .iter()
        .copied()
        .chain(std::iter::once(0))
        .chain(env_ptrs.iter().copied())
        .chain(std::iter::once(0));
    let mut word_addr = argv_addr;
    for word in words {
        mem.set_u64(word_addr, word)?;
        word_addr += 8;
    }

    Ok(ArgvBlock {
        argc: argv.len() as i32,
        argv: argv_addr as i32,
        end: end as u32,
    })
}

fn align8(n: u64) -> u64 {
    (n + 7) & !7
}
