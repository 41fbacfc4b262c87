//! Per-open-handle session state
//!
//! A session owns only a forward-only cursor into a `Store`. It never holds
//! the store's bytes; all transfers go through `Store::read`/`Store::write`.

use std::fmt;

use crate::idgen::Handle;

/// Lifecycle state of an open session
///
/// `Closed` has no variant: closing consumes the `Session`, so no operation
/// can follow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Freshly opened, cursor at 0, no transfer yet
    Opened,
    /// At least one successful read or write
    Active,
}

/// Session cursor into a store
///
/// # Invariants
///
/// - `cursor` only increases and never exceeds the store capacity. Only the
///   store advances it, by exactly the number of bytes it transferred.
pub struct Session {
    handle: Handle,
    cursor: usize,
    state: SessionState,
}

impl Session {
    pub(crate) fn new(handle: Handle) -> Self {
        Self {
            handle,
            cursor: 0,
            state: SessionState::Opened,
        }
    }

    #[must_use]
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Offset at which the next read or write begins
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub(crate) fn advance(&mut self, count: usize) {
        self.cursor += count;
        self.state = SessionState::Active;
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Session(handle={}, cursor={}, state={:?})",
            self.handle, self.cursor, self.state
        )
    }
}
