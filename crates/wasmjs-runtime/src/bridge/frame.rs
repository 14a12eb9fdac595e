//! Stack-frame handles for host imports.
//!
//! A host import may only address its arguments and results through a
//! [`Frame`].  Before calling back into script code it must give the frame
//! up with [`Frame::leave`]; the only way back to a writable frame is
//! [`Detached::reenter`], which re-reads the guest's stack pointer.  A
//! nested call can move the guest stack, so offsets computed from the old
//! `sp` are unusable for results.

use super::syscall::Syscall;

/// The argument/result area of one host call.
#[derive(Debug)]
pub struct Frame {
    sp: u32,
}

/// A frame given up across a reentrant call.
#[derive(Debug)]
#[must_use = "a detached frame must be re-entered before writing results"]
pub struct Detached {
    _private: (),
}

impl Frame {
    pub(crate) fn enter(sp: i32) -> Self {
        Self { sp: sp as u32 }
    }

    pub fn sp(&self) -> u32 {
        self.sp
    }

    /// The word the guest passed, as the `i32` it was.
    pub fn raw(&self) -> i32 {
        self.sp as i32
    }

    /// Address of the word at `offset` above `sp`.
    pub fn at(&self, offset: u32) -> u64 {
        u64::from(self.sp) + u64::from(offset)
    }

    pub fn leave(self) -> Detached {
        Detached { _private: () }
    }
}

impl Detached {
    /// Re-acquire the frame from the guest's current stack pointer.
    pub(crate) fn reenter(self, sys: &mut Syscall<'_, '_>) -> Result<Frame, wasmi::Error> {
        let sp = sys.getsp()?;
        Ok(Frame::enter(sp))
    }
}
