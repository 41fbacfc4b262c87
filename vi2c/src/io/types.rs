//! Store error types

use core::ffi::c_int;

use crate::errno::{EFAULT, ENOSPC};

/// Bytes could not be moved across the caller/store boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferFault;

impl std::fmt::Display for TransferFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bad address in caller region")
    }
}

impl std::error::Error for TransferFault {}

/// Errors that can occur in store transfers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// Write attempted with the session cursor at capacity
    NoSpace,
    /// Copy to or from the caller's region failed; nothing was transferred
    TransferFault,
}

impl StoreError {
    /// Errno code reported for this error at the device boundary
    #[must_use]
    pub fn errno(&self) -> c_int {
        match self {
            Self::NoSpace => ENOSPC,
            Self::TransferFault => EFAULT,
        }
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoSpace => write!(f, "No space left in store"),
            Self::TransferFault => write!(f, "Transfer fault: {TransferFault}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<TransferFault> for StoreError {
    fn from(_: TransferFault) -> Self {
        Self::TransferFault
    }
}

impl embedded_io::Error for StoreError {
    fn kind(&self) -> embedded_io::ErrorKind {
        crate::errno::errno_to_error_kind(self.errno())
    }
}
