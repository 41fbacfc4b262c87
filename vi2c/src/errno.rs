//! Errno codes used at the device boundary and their mapping to
//! `embedded_io::ErrorKind`.

use core::ffi::c_int;

pub const EBADF: c_int = 9;
pub const EFAULT: c_int = 14;
pub const ENODEV: c_int = 19;
pub const ENOSPC: c_int = 28;

/// Convert errno to `embedded_io::ErrorKind`
#[must_use]
#[allow(clippy::match_same_arms)] // common errno values are listed explicitly
pub fn errno_to_error_kind(errno: c_int) -> embedded_io::ErrorKind {
    match errno {
        1 | 13 => embedded_io::ErrorKind::PermissionDenied, // EPERM, EACCES
        2 | ENODEV => embedded_io::ErrorKind::NotFound,     // ENOENT, ENODEV
        EBADF | 22 => embedded_io::ErrorKind::InvalidInput, // EBADF, EINVAL
        EFAULT => embedded_io::ErrorKind::InvalidData,
        12 | ENOSPC => embedded_io::ErrorKind::OutOfMemory, // ENOMEM, ENOSPC
        _ => embedded_io::ErrorKind::Other,
    }
}

/// Short human-readable name for an errno code
#[must_use]
pub fn errno_name(errno: c_int) -> &'static str {
    match errno {
        EBADF => "EBADF",
        EFAULT => "EFAULT",
        ENODEV => "ENODEV",
        ENOSPC => "ENOSPC",
        _ => "E?",
    }
}
