//! LocalDB Core - binding over the SQL Server Express LocalDB instance API.
//!
//! The instance API is a native library (`SqlUserInstance.dll`) that creates,
//! starts, stops, shares and describes per-user LocalDB engine instances.
//! This crate finds that library through the registry, loads it, resolves its
//! exports and exposes them as typed calls. The engine logic itself lives
//! entirely in the native library.
//!
//! # Example
//!
//! ```rust,no_run
//! use localdb_core::LocalDb;
//!
//! fn main() -> localdb_core::Result<()> {
//!     let localdb = LocalDb::connect()?;
//!     for name in localdb.instances()? {
//!         let info = localdb.instance_info(&name)?;
//!         println!("{} running={}", info.instance_name, info.is_running);
//!     }
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod ffi;
pub mod flags;
pub mod instance_info;
pub mod loader;
pub mod locator;
pub mod platform;
pub mod sid;
pub mod version;
pub mod version_info;
pub mod wide;

// Re-export commonly used types
pub use api::{HResult, LocalDbApi, SizedCall};
pub use client::LocalDb;
pub use config::{LocalDbLimits, LocatorConfig, RegistryConfig, RegistryView, VersionSelection};
pub use error::{LocalDbError, Result};
pub use ffi::{InstanceNameEntry, VersionNameEntry};
pub use instance_info::{FileTime, InstanceInfo, InstanceInfoBuffer, INSTANCE_INFO_SIZE};
pub use loader::NativeLibrary;
pub use locator::{LocatedLibrary, MemoryRegistry, VersionRegistry};
pub use sid::OwnerSid;
pub use version::EngineVersion;
pub use version_info::{VersionInfo, VersionInfoBuffer, VERSION_INFO_SIZE};
