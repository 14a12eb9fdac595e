//! Typed, bounds-checked access to a linear-memory buffer.
//!
//! All integers are little-endian.  64-bit words are read and written as
//! native two's-complement `i64`/`u64`, so negative values round-trip.
//!
//! A view borrows the buffer it was created from.  The buffer may move
//! whenever guest code runs (memory growth), so callers build a new view for
//! every access instead of keeping one across a call into the guest.

use std::borrow::Cow;

use crate::error::{AbiError, AbiResult};
use crate::slot::Slot;

/// Read-only view over linear memory.
#[derive(Debug, Clone, Copy)]
pub struct MemoryView<'a> {
    bytes: &'a [u8],
}

/// Mutable view over linear memory.
#[derive(Debug)]
pub struct MemoryViewMut<'a> {
    bytes: &'a mut [u8],
}

fn range(addr: u64, len: u64, size: usize) -> AbiResult<std::ops::Range<usize>> {
    let out_of_bounds = || AbiError::OutOfBounds { addr, len, size };
    let end = addr.checked_add(len).ok_or_else(out_of_bounds)?;
    if end > size as u64 {
        return Err(out_of_bounds());
    }
    Ok(addr as usize..end as usize)
}

fn array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    out
}

impl<'a> MemoryView<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// `len` bytes starting at `addr`.
    pub fn bytes(&self, addr: u64, len: u64) -> AbiResult<&'a [u8]> {
        let r = range(addr, len, self.bytes.len())?;
        Ok(&self.bytes[r])
    }

    pub fn u8(&self, addr: u64) -> AbiResult<u8> {
        Ok(self.bytes(addr, 1)?[0])
    }

    pub fn u32(&self, addr: u64) -> AbiResult<u32> {
        Ok(u32::from_le_bytes(array(self.bytes(addr, 4)?)))
    }

    pub fn i32(&self, addr: u64) -> AbiResult<i32> {
        Ok(i32::from_le_bytes(array(self.bytes(addr, 4)?)))
    }

    pub fn u64(&self, addr: u64) -> AbiResult<u64> {
        Ok(u64::from_le_bytes(array(self.bytes(addr, 8)?)))
    }

    pub fn i64(&self, addr: u64) -> AbiResult<i64> {
        Ok(i64::from_le_bytes(array(self.bytes(addr, 8)?)))
    }

    /// The value slot stored at `addr`.
    pub fn slot(&self, addr: u64) -> AbiResult<Slot> {
        Ok(Slot::decode(self.u64(addr)?))
    }

    /// Resolve the `(ptr: i64, len: i64)` header at `addr` to a byte range.
    pub fn slice_range(&self, addr: u64) -> AbiResult<(u64, u64)> {
        let ptr = self.i64(addr)?;
        let len = self.i64(addr + 8)?;
        if ptr < 0 || len < 0 {
            return Err(AbiError::OutOfBounds {
                addr: ptr as u64,
                len: len as u64,
                size: self.bytes.len(),
            });
        }
        Ok((ptr as u64, len as u64))
    }

    /// The bytes described by the slice header at `addr`.
    pub fn slice(&self, addr: u64) -> AbiResult<&'a [u8]> {
        let (ptr, len) = self.slice_range(addr)?;
        self.bytes(ptr, len)
    }

    /// The UTF-8 string described by the header at `addr`; invalid
    /// sequences are replaced.
    pub fn string(&self, addr: u64) -> AbiResult<Cow<'a, str>> {
        Ok(String::from_utf8_lossy(self.slice(addr)?))
    }

    /// The slot array described by the `(ptr, count)` header at `addr`.
    pub fn slots(&self, addr: u64) -> AbiResult<Vec<Slot>> {
        let ptr = self.i64(addr)?;
        let count = self.i64(addr + 8)?;
        if ptr < 0 || count < 0 {
            return Err(AbiError::OutOfBounds {
                addr: ptr as u64,
                len: (count as u64).saturating_mul(8),
                size: self.bytes.len(),
            });
        }
        let raw = self.bytes(ptr as u64, (count as u64).saturating_mul(8))?;
        Ok(raw
            .chunks_exact(8)
            .map(|chunk| Slot::decode(u64::from_le_bytes(array(chunk))))
            .collect())
    }
}

impl<'a> MemoryViewMut<'a> {
    pub fn new(bytes: &'a mut [u8]) -> Self {
        Self { bytes }
    }

    /// Reborrow as a read-only view.
    pub fn view(&self) -> MemoryView<'_> {
        MemoryView::new(&self.bytes[..])
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn bytes_mut(&mut self, addr: u64, len: u64) -> AbiResult<&mut [u8]> {
        let r = range(addr, len, self.bytes.len())?;
        Ok(&mut self.bytes[r])
    }

    pub fn write_bytes(&mut self, addr: u64, src: &[u8]) -> AbiResult<()> {
        self.bytes_mut(addr, src.len() as u64)?.copy_from_slice(src);
        Ok(())
    }

    pub fn set_u8(&mut self, addr: u64, value: u8) -> AbiResult<()> {
        self.write_bytes(addr, &[value])
    }

    pub fn set_u32(&mut self, addr: u64, value: u32) -> AbiResult<()> {
        self.write_bytes(addr, &value.to_le_bytes())
    }

    pub fn set_i32(&mut self, addr: u64, value: i32) -> AbiResult<()> {
        self.write_bytes(addr, &value.to_le_bytes())
    }

    pub fn set_u64(&mut self, addr: u64, value: u64) -> AbiResult<()> {
        self.write_bytes(addr, &value.to_le_bytes())
    }

    pub fn set_i64(&mut self, addr: u64, value: i64) -> AbiResult<()> {
        self.write_bytes(addr, &value.to_le_bytes())
    }

    pub fn set_slot(&mut self, addr: u64, slot: Slot) -> AbiResult<()> {
        self.set_u64(addr, slot.encode())
    }

    /// The bytes described by the slice header at `addr`, writable.
    pub fn slice_mut(&mut self, addr: u64) -> AbiResult<&mut [u8]> {
        let (ptr, len) = self.view().slice_range(addr)?;
        self.bytes_mut(ptr, len)
    }
}
