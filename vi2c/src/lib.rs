pub mod config;
pub mod device;
pub mod errno;
pub mod idgen;
pub mod io;
pub mod session;
pub mod stream;

// Re-export device types for convenience
pub use device::{Device, DeviceError, DeviceNumber};

// Re-export config types for convenience
pub use config::{ConfigError, DeviceConfig};

// Re-export idgen types for convenience
pub use idgen::{Handle, IdGen};

// Re-export store types for convenience
pub use io::{Store, StoreError, TransferFault, UserDest, UserPtr, UserSource};

pub use session::{Session, SessionState};
pub use stream::SessionStream;
