//! I/O module for vi2c
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  Device (registration layer)        │
//! │  - register / deregister            │
//! │  - handle table of sessions         │
//! │  - errno translation                │
//! └─────────────────────────────────────┘
//!          ▲
//!          │ owns exactly one Store
//!          ▼
//! ┌─────────────────────────────────────┐
//! │  Store (shared storage)             │
//! │  - Arc<Mutex<Box<[u8]>>>            │
//! │  - read()/write() at a cursor       │
//! └─────────────────────────────────────┘
//!          ▲
//!          │ copies through
//!          ▼
//! ┌─────────────────────────────────────┐
//! │  UserDest / UserSource (regions)    │
//! │  - slices, Vec, raw UserPtr         │
//! └─────────────────────────────────────┘
//! ```

pub mod region;
pub mod store;
pub mod types;

pub use region::{UserDest, UserPtr, UserSource};
pub use store::{Store, DEFAULT_CAPACITY};
pub use types::{StoreError, TransferFault};
