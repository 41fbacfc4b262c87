//! Device registration layer
//!
//! Owns the one `Store` of a registered device and maps handle-based
//! requests (open, read, write, close) onto store sessions. This is the part
//! a kernel would reach through a character device's file-operations table:
//! - register / deregister lifecycle with a dynamically allocated number
//! - open-handle table (one `Session` per handle)
//! - translation of store errors into errno codes

use core::ffi::c_int;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use crate::config::{ConfigError, DeviceConfig};
use crate::errno::{errno_name, EBADF, ENODEV};
use crate::idgen::{Handle, IdGen};
use crate::io::{Store, StoreError, UserDest, UserSource};
use crate::session::Session;

/// Device number allocated at registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceNumber {
    major: u32,
    minor: u32,
}

impl DeviceNumber {
    #[must_use]
    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    #[must_use]
    pub fn major(&self) -> u32 {
        self.major
    }

    #[must_use]
    pub fn minor(&self) -> u32 {
        self.minor
    }
}

impl fmt::Display for DeviceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.major, self.minor)
    }
}

/// Errors returned by device operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    /// `open()` on a device that is not registered
    NotRegistered,
    /// Handle is unknown, already closed, or predates a deregistration
    BadHandle(Handle),
    /// The store rejected the transfer
    Store(StoreError),
}

impl DeviceError {
    /// Errno code for this error
    #[must_use]
    pub fn errno(&self) -> c_int {
        match self {
            Self::NotRegistered => ENODEV,
            Self::BadHandle(_) => EBADF,
            Self::Store(err) => err.errno(),
        }
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRegistered => write!(f, "Device is not registered"),
            Self::BadHandle(handle) => write!(f, "Bad handle: {handle}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for DeviceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::NotRegistered | Self::BadHandle(_) => None,
        }
    }
}

impl From<StoreError> for DeviceError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

/// Live registration: everything created by `register_device()`
struct Registration {
    number: DeviceNumber,
    node: String,
    store: Store,
    /// Each session has its own lock so transfers on different handles only
    /// contend on the store lock.
    sessions: HashMap<Handle, Arc<Mutex<Session>>>,
}

/// Emulated character device backed by a single fixed-capacity store
///
/// The device is the single owner of its store. The store exists from
/// `register_device()` to `deregister_device()`; both are idempotent.
///
/// # Example
///
/// ```
/// use vi2c::{Device, DeviceConfig};
///
/// let device = Device::new(DeviceConfig::default()).unwrap();
/// device.register_device();
///
/// let writer = device.open().unwrap();
/// assert_eq!(device.write(writer, &b"HelloWorld"[..]).unwrap(), 10);
/// device.close(writer).unwrap();
///
/// let reader = device.open().unwrap();
/// let mut buf = [0u8; 10];
/// assert_eq!(device.read(reader, &mut buf[..]).unwrap(), 10);
/// assert_eq!(&buf, b"HelloWorld");
/// ```
pub struct Device {
    config: DeviceConfig,
    majors: IdGen,
    /// Outlives registrations so stale handles never match a new session
    handles: Arc<IdGen>,
    registration: Mutex<Option<Registration>>,
}

impl Device {
    /// Create an unregistered device.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the configuration does not validate.
    pub fn new(config: DeviceConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            majors: IdGen::starting_at(u64::from(config.first_major)),
            handles: Arc::new(IdGen::new()),
            config,
            registration: Mutex::new(None),
        })
    }

    #[must_use]
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Register the device and create its store
    ///
    /// Allocates a device number, creates a zero-filled store of the
    /// configured capacity and records the device node. Calling it again
    /// while registered returns the existing number and changes nothing.
    pub fn register_device(&self) -> DeviceNumber {
        let mut registration = self.registration.lock();
        if let Some(existing) = registration.as_ref() {
            debug!(number = %existing.number, "device already registered");
            return existing.number;
        }

        let number = DeviceNumber::new(self.next_major(), 0);
        let node = self.config.node_path();
        info!(
            name = %self.config.name,
            major = number.major(),
            capacity = self.config.capacity,
            "registered device"
        );
        info!(node = %node, "device node created");

        *registration = Some(Registration {
            number,
            node,
            store: Store::with_handles(self.config.capacity, Arc::clone(&self.handles)),
            sessions: HashMap::new(),
        });
        number
    }

    fn next_major(&self) -> u32 {
        let id = self.majors.next_id();
        u32::try_from(id).unwrap_or_else(|_| {
            warn!(id, "major number space exhausted, saturating");
            u32::MAX
        })
    }

    /// Deregister the device, destroying its store and every open session
    ///
    /// Returns `false` if the device was not registered.
    pub fn deregister_device(&self) -> bool {
        let Some(registration) = self.registration.lock().take() else {
            debug!("deregister on unregistered device");
            return false;
        };
        if !registration.sessions.is_empty() {
            warn!(
                open = registration.sessions.len(),
                "deregistering with open sessions"
            );
        }
        info!(
            name = %self.config.name,
            number = %registration.number,
            node = %registration.node,
            "deregistered device"
        );
        true
    }

    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.registration.lock().is_some()
    }

    #[must_use]
    pub fn device_number(&self) -> Option<DeviceNumber> {
        self.registration.lock().as_ref().map(|r| r.number)
    }

    #[must_use]
    pub fn node_path(&self) -> Option<String> {
        self.registration.lock().as_ref().map(|r| r.node.clone())
    }

    /// Shared handle to the current store, if registered
    #[must_use]
    pub fn store(&self) -> Option<Store> {
        self.registration.lock().as_ref().map(|r| r.store.clone())
    }

    /// Number of currently open sessions
    #[must_use]
    pub fn open_sessions(&self) -> usize {
        self.registration
            .lock()
            .as_ref()
            .map_or(0, |r| r.sessions.len())
    }

    /// Open a new session at offset 0
    ///
    /// # Errors
    ///
    /// `DeviceError::NotRegistered` if there is no store.
    pub fn open(&self) -> Result<Handle, DeviceError> {
        let mut registration = self.registration.lock();
        let registration = registration.as_mut().ok_or(DeviceError::NotRegistered)?;

        let session = registration.store.open();
        let handle = session.handle();
        registration
            .sessions
            .insert(handle, Arc::new(Mutex::new(session)));
        info!(%handle, "device opened");
        Ok(handle)
    }

    /// Close a session; the store's bytes are kept
    ///
    /// # Errors
    ///
    /// `DeviceError::BadHandle` if the handle is not open.
    pub fn close(&self, handle: Handle) -> Result<(), DeviceError> {
        let mut registration = self.registration.lock();
        let session = registration
            .as_mut()
            .and_then(|r| r.sessions.remove(&handle).map(|s| (r.store.clone(), s)));
        drop(registration);

        let (store, session) = session.ok_or(DeviceError::BadHandle(handle))?;
        // A transfer in flight on this handle holds its own clone; the cursor
        // is discarded when the last clone goes.
        match Arc::try_unwrap(session) {
            Ok(session) => store.close(session.into_inner()),
            Err(_) => debug!(%handle, "close with transfer in flight"),
        }
        info!(%handle, "device closed");
        Ok(())
    }

    /// Read into `dest` from the handle's cursor
    ///
    /// Returns the byte count; 0 means the cursor is at capacity.
    ///
    /// # Errors
    ///
    /// `DeviceError::BadHandle` for an unknown handle,
    /// `DeviceError::Store(StoreError::TransferFault)` if `dest` faults.
    pub fn read<D>(&self, handle: Handle, dest: &mut D) -> Result<usize, DeviceError>
    where
        D: UserDest + ?Sized,
    {
        let (store, session) = self.lookup(handle)?;
        let mut session = session.lock();
        let count = store
            .read(&mut session, dest)
            .map_err(|err| Self::failed(handle, "read", err))?;
        trace!(%handle, count, cursor = session.cursor(), "read");
        Ok(count)
    }

    /// Write `src` at the handle's cursor
    ///
    /// Returns the byte count, which may be short near capacity.
    ///
    /// # Errors
    ///
    /// `DeviceError::BadHandle` for an unknown handle,
    /// `DeviceError::Store(StoreError::NoSpace)` at capacity,
    /// `DeviceError::Store(StoreError::TransferFault)` if `src` faults.
    pub fn write<S>(&self, handle: Handle, src: &S) -> Result<usize, DeviceError>
    where
        S: UserSource + ?Sized,
    {
        let (store, session) = self.lookup(handle)?;
        let mut session = session.lock();
        let count = store
            .write(&mut session, src)
            .map_err(|err| Self::failed(handle, "write", err))?;
        trace!(%handle, count, cursor = session.cursor(), "write");
        Ok(count)
    }

    /// Read with a POSIX-style return: byte count, or `-errno`
    pub fn sys_read<D>(&self, handle: Handle, dest: &mut D) -> isize
    where
        D: UserDest + ?Sized,
    {
        Self::to_syscall_result(self.read(handle, dest))
    }

    /// Write with a POSIX-style return: byte count, or `-errno`
    pub fn sys_write<S>(&self, handle: Handle, src: &S) -> isize
    where
        S: UserSource + ?Sized,
    {
        Self::to_syscall_result(self.write(handle, src))
    }

    fn lookup(&self, handle: Handle) -> Result<(Store, Arc<Mutex<Session>>), DeviceError> {
        let registration = self.registration.lock();
        registration
            .as_ref()
            .and_then(|r| {
                r.sessions
                    .get(&handle)
                    .map(|s| (r.store.clone(), Arc::clone(s)))
            })
            .ok_or(DeviceError::BadHandle(handle))
    }

    fn failed(handle: Handle, op: &str, err: StoreError) -> DeviceError {
        match err {
            StoreError::NoSpace => debug!(%handle, op, errno = errno_name(err.errno()), "{err}"),
            StoreError::TransferFault => {
                warn!(%handle, op, errno = errno_name(err.errno()), "{err}");
            }
        }
        DeviceError::Store(err)
    }

    #[allow(clippy::cast_possible_wrap)]
    fn to_syscall_result(result: Result<usize, DeviceError>) -> isize {
        match result {
            Ok(count) => count as isize,
            Err(err) => -(err.errno() as isize),
        }
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registration = self.registration.lock();
        match registration.as_ref() {
            Some(r) => write!(
                f,
                "Device(name={}, number={}, capacity={}, sessions={})",
                self.config.name,
                r.number,
                r.store.capacity(),
                r.sessions.len()
            ),
            None => write!(f, "Device(name={}, unregistered)", self.config.name),
        }
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        if self.is_registered() {
            self.deregister_device();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_device(capacity: usize) -> Device {
        let config = DeviceConfig {
            capacity,
            ..DeviceConfig::default()
        };
        Device::new(config).unwrap()
    }

    #[test]
    fn test_open_requires_registration() {
        let device = small_device(8);
        assert_eq!(device.open(), Err(DeviceError::NotRegistered));
        assert_eq!(DeviceError::NotRegistered.errno(), ENODEV);
    }

    #[test]
    fn test_register_is_idempotent() {
        let device = small_device(8);
        let first = device.register_device();
        let second = device.register_device();
        assert_eq!(first, second);
        assert_eq!(first.major(), 240);
        assert_eq!(first.minor(), 0);
        assert_eq!(device.node_path().as_deref(), Some("/dev/vI2C"));
    }

    #[test]
    fn test_deregister_is_idempotent() {
        let device = small_device(8);
        device.register_device();
        assert!(device.deregister_device());
        assert!(!device.deregister_device());
        assert!(!device.is_registered());
        assert!(device.store().is_none());
    }

    #[test]
    fn test_close_unknown_handle() {
        let device = small_device(8);
        device.register_device();
        let handle = device.open().unwrap();
        device.close(handle).unwrap();
        assert_eq!(device.close(handle), Err(DeviceError::BadHandle(handle)));
    }

    #[test]
    fn test_major_saturates_at_u32_max() {
        let device = Device::new(DeviceConfig {
            first_major: u32::MAX,
            ..DeviceConfig::default()
        })
        .unwrap();
        assert_eq!(device.register_device().major(), u32::MAX);
        device.deregister_device();
        assert_eq!(device.register_device().major(), u32::MAX);
    }

    #[test]
    fn test_close_with_transfer_in_flight() {
        let device = small_device(8);
        device.register_device();
        let handle = device.open().unwrap();

        // a concurrent transfer holds its own clone of the session
        let (_store, in_flight) = device.lookup(handle).unwrap();
        device.close(handle).unwrap();

        assert_eq!(device.open_sessions(), 0);
        assert_eq!(in_flight.lock().handle(), handle);
        assert_eq!(device.close(handle), Err(DeviceError::BadHandle(handle)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = DeviceConfig {
            capacity: 0,
            ..DeviceConfig::default()
        };
        assert!(matches!(Device::new(config), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_debug_format() {
        let device = small_device(8);
        assert_eq!(format!("{device:?}"), "Device(name=vI2C, unregistered)");
        device.register_device();
        assert_eq!(
            format!("{device:?}"),
            "Device(name=vI2C, number=240:0, capacity=8, sessions=0)"
        );
    }
}
