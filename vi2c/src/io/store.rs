//! Fixed-capacity shared store
//!
//! The byte container every session of a device reads from and writes to.

use parking_lot::Mutex;
use std::sync::Arc;

use super::region::{UserDest, UserSource};
use super::types::StoreError;
use crate::idgen::IdGen;
use crate::session::Session;

/// Default store capacity in bytes
pub const DEFAULT_CAPACITY: usize = 1024;

/// Fixed-capacity byte store shared by all sessions
///
/// Backed by `Arc<Mutex<Box<[u8]>>>`. Clones share the same bytes, so the
/// owner can hand a clone to every session without copying data. The byte
/// array is allocated once, zero-filled, and never resized.
///
/// # Thread Safety
///
/// One `parking_lot::Mutex` guards the bytes for the duration of a single
/// `read()` or `write()`, so each transfer is atomic with respect to other
/// sessions. Sessions writing overlapping offsets still race in the sense of
/// last-writer-wins; no region reservation is made.
///
/// # Example
///
/// ```
/// use vi2c::io::Store;
///
/// let store = Store::new(16);
/// let mut writer = store.open();
/// assert_eq!(store.write(&mut writer, &b"hello".to_vec()).unwrap(), 5);
///
/// let mut reader = store.open();
/// let mut buf = [0u8; 5];
/// assert_eq!(store.read(&mut reader, &mut buf[..]).unwrap(), 5);
/// assert_eq!(&buf, b"hello");
/// ```
#[derive(Clone)]
pub struct Store {
    data: Arc<Mutex<Box<[u8]>>>,
    capacity: usize,
    handles: Arc<IdGen>,
}

impl Store {
    /// Create a zero-filled store of `capacity` bytes
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::with_handles(capacity, Arc::new(IdGen::new()))
    }

    /// Create a zero-filled store whose session handles come from `handles`
    ///
    /// Owners that replace the store over time pass the same generator to
    /// every store, so a handle is never issued twice.
    #[must_use]
    pub fn with_handles(capacity: usize, handles: Arc<IdGen>) -> Self {
        Self {
            data: Arc::new(Mutex::new(vec![0u8; capacity].into_boxed_slice())),
            capacity,
            handles,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Open a new session positioned at offset 0
    ///
    /// Never clears or reinitializes the stored bytes.
    #[must_use]
    pub fn open(&self) -> Session {
        let session = Session::new(self.handles.next_handle());
        log::debug!("open {session:?}");
        session
    }

    /// Close a session, discarding its cursor
    ///
    /// The stored bytes are retained for later sessions.
    pub fn close(&self, session: Session) {
        log::debug!("close {session:?}");
    }

    /// Read from the store at the session's cursor (POSIX-style)
    ///
    /// Copies `min(dest.len(), capacity - cursor)` bytes into `dest` and
    /// advances the cursor by that count.
    ///
    /// Returns:
    /// - `Ok(n)` with `n > 0`: bytes read, possibly fewer than requested
    /// - `Ok(0)`: the cursor is at capacity, or `dest` is empty
    ///
    /// # Errors
    ///
    /// `StoreError::TransferFault` if the copy into `dest` fails. In that
    /// case `dest` is unmodified and the cursor does not move.
    pub fn read<D>(&self, session: &mut Session, dest: &mut D) -> Result<usize, StoreError>
    where
        D: UserDest + ?Sized,
    {
        let data = self.data.lock();
        let start = session.cursor();
        let available = self.capacity.saturating_sub(start);
        if available == 0 {
            log::trace!("read at end of store: {session:?}");
            return Ok(0);
        }

        let count = available.min(dest.len());
        let end = start + count;

        // start <= end <= capacity == data.len()
        #[allow(clippy::indexing_slicing)]
        let src = &data[start..end];
        if let Err(fault) = dest.copy_to_user(src) {
            log::warn!("read fault on {session:?}: {fault}");
            return Err(fault.into());
        }
        drop(data);

        session.advance(count);
        Ok(count)
    }

    /// Write into the store at the session's cursor (POSIX-style)
    ///
    /// Copies `min(src.len(), capacity - cursor)` bytes from `src` and
    /// advances the cursor by that count. A short write is not an error; the
    /// caller resubmits the remainder.
    ///
    /// # Errors
    ///
    /// - `StoreError::NoSpace` if the cursor is already at capacity. There is
    ///   no wrap-around to offset 0.
    /// - `StoreError::TransferFault` if the copy from `src` fails. No bytes are
    ///   written and the cursor does not move.
    pub fn write<S>(&self, session: &mut Session, src: &S) -> Result<usize, StoreError>
    where
        S: UserSource + ?Sized,
    {
        let mut data = self.data.lock();
        let start = session.cursor();
        let available = self.capacity.saturating_sub(start);
        if available == 0 {
            log::debug!("write rejected, store full: {session:?}");
            return Err(StoreError::NoSpace);
        }

        let count = available.min(src.len());
        let end = start + count;

        #[allow(clippy::indexing_slicing)]
        let dst = &mut data[start..end];
        if let Err(fault) = src.copy_from_user(dst) {
            log::warn!("write fault on {session:?}: {fault}");
            return Err(fault.into());
        }
        drop(data);

        session.advance(count);
        Ok(count)
    }

    /// Copy of the current contents, for diagnostics
    #[must_use]
    pub fn snapshot(&self) -> Vec<u8> {
        self.data.lock().to_vec()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("capacity", &self.capacity)
            .field("shared", &Arc::strong_count(&self.data))
            .finish_non_exhaustive()
    }
}
