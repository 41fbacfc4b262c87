use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one open session on a store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle {
    id: u64,
}

impl Handle {
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self { id }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.id)
    }
}

/// Thread-safe monotonic ID generator
///
/// Used both for session handles and for device major numbers.
#[derive(Debug)]
pub struct IdGen {
    next_id: AtomicU64,
}

impl IdGen {
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Generator whose first issued ID is `first`
    #[must_use]
    pub fn starting_at(first: u64) -> Self {
        Self {
            next_id: AtomicU64::new(first),
        }
    }

    /// Get the next unique ID
    pub fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Get the next unique ID wrapped as a `Handle`
    pub fn next_handle(&self) -> Handle {
        Handle::new(self.next_id())
    }
}

impl Default for IdGen {
    fn default() -> Self {
        Self::new()
    }
}
