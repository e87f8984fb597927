//! Platform abstraction layer.
//!
//! All OS-specific code lives here: the registry reader behind
//! [`VersionRegistry`](crate::locator::VersionRegistry) and the dynamic library
//! behind [`NativeLibrary`](crate::loader::NativeLibrary).
//!
//! # Supported Platforms
//!
//! - **Windows**: Full support
//! - **Others**: LocalDB does not exist; the registry reports no installation.
//!   Libraries still load through the platform loader, which lets the binding
//!   run against stand-in libraries.

mod library;
pub use library::DynamicLibrary;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::SystemRegistry;

#[cfg(not(windows))]
mod unsupported;
#[cfg(not(windows))]
pub use unsupported::SystemRegistry;

/// Returns true if LocalDB can exist on the current platform.
pub fn is_supported_platform() -> bool {
    cfg!(windows)
}
