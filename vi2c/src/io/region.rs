//! Caller-side memory regions
//!
//! A store never touches caller memory directly. Every transfer goes through
//! `UserDest::copy_to_user` or `UserSource::copy_from_user`, which either
//! move all requested bytes or fail with `TransferFault` having moved none.
//!
//! Plain slices never fault. `UserPtr` wraps a raw (pointer, length) pair the
//! way a syscall argument arrives, and faults on a null pointer.

use super::types::TransferFault;

/// Region the store copies bytes out to (read direction)
pub trait UserDest {
    /// Number of bytes the caller asked for
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy `src` into the first `src.len()` bytes of the region.
    ///
    /// The store guarantees `src.len() <= self.len()`. On error the region
    /// must be left unmodified.
    fn copy_to_user(&mut self, src: &[u8]) -> Result<(), TransferFault>;
}

/// Region the store copies bytes in from (write direction)
pub trait UserSource {
    /// Number of bytes the caller offered
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fill `dst` from the first `dst.len()` bytes of the region.
    ///
    /// The store guarantees `dst.len() <= self.len()`. On error `dst` must be
    /// left unmodified.
    fn copy_from_user(&self, dst: &mut [u8]) -> Result<(), TransferFault>;
}

impl UserDest for [u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn copy_to_user(&mut self, src: &[u8]) -> Result<(), TransferFault> {
        self.get_mut(..src.len())
            .ok_or(TransferFault)?
            .copy_from_slice(src);
        Ok(())
    }
}

impl UserSource for [u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn copy_from_user(&self, dst: &mut [u8]) -> Result<(), TransferFault> {
        dst.copy_from_slice(self.get(..dst.len()).ok_or(TransferFault)?);
        Ok(())
    }
}

impl UserDest for Vec<u8> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn copy_to_user(&mut self, src: &[u8]) -> Result<(), TransferFault> {
        self.as_mut_slice().copy_to_user(src)
    }
}

impl UserSource for Vec<u8> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn copy_from_user(&self, dst: &mut [u8]) -> Result<(), TransferFault> {
        self.as_slice().copy_from_user(dst)
    }
}

/// Raw caller region given as a pointer and a length
///
/// A null pointer faults on any non-empty copy. A zero-byte copy never
/// faults.
#[derive(Debug)]
pub struct UserPtr {
    ptr: *mut u8,
    len: usize,
}

impl UserPtr {
    /// Wrap a raw caller region.
    ///
    /// # Safety
    ///
    /// If `ptr` is non-null it must be valid for reads and writes of `len`
    /// bytes for as long as the `UserPtr` is used, and no other reference
    /// may access that memory during a transfer.
    #[must_use]
    pub unsafe fn new(ptr: *mut u8, len: usize) -> Self {
        Self { ptr, len }
    }

    /// A region of `len` bytes at the null address. Every non-empty copy faults.
    #[must_use]
    pub fn null(len: usize) -> Self {
        Self {
            ptr: std::ptr::null_mut(),
            len,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        self.ptr.is_null()
    }

    fn check(&self, count: usize) -> Result<(), TransferFault> {
        if count > self.len || (self.ptr.is_null() && count > 0) {
            return Err(TransferFault);
        }
        Ok(())
    }
}

impl UserDest for UserPtr {
    fn len(&self) -> usize {
        self.len
    }

    fn copy_to_user(&mut self, src: &[u8]) -> Result<(), TransferFault> {
        self.check(src.len())?;
        if src.is_empty() {
            return Ok(());
        }
        // SAFETY: non-null and `src.len() <= self.len` checked above; validity
        // of the region is the contract of `UserPtr::new`.
        unsafe { std::ptr::copy_nonoverlapping(src.as_ptr(), self.ptr, src.len()) };
        Ok(())
    }
}

impl UserSource for UserPtr {
    fn len(&self) -> usize {
        self.len
    }

    fn copy_from_user(&self, dst: &mut [u8]) -> Result<(), TransferFault> {
        self.check(dst.len())?;
        if dst.is_empty() {
            return Ok(());
        }
        // SAFETY: see `copy_to_user`.
        unsafe { std::ptr::copy_nonoverlapping(self.ptr.cast_const(), dst.as_mut_ptr(), dst.len()) };
        Ok(())
    }
}
