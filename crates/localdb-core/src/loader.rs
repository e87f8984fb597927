//! Loading the instance API library and resolving its exports.

use crate::error::{LocalDbError, Result};
use std::ffi::c_void;
use std::path::Path;
use std::ptr::NonNull;
use tracing::{debug, warn};

/// A loaded native library that can resolve exports by name.
///
/// Dropping the value releases the library, so every function pointer taken
/// from it must be dropped first.
pub trait NativeLibrary: Send + Sync {
    /// Address of the export called `name` (exact, case-sensitive), if any.
    fn symbol(&self, name: &str) -> Option<NonNull<c_void>>;
}

/// Load the library at `path`.
///
/// A missing path is reported as [`LocalDbError::LoadFailed`] just like an
/// OS-level load failure.
pub fn load_library(path: Option<&Path>) -> Result<Box<dyn NativeLibrary>> {
    let path = path.ok_or_else(|| LocalDbError::LoadFailed {
        path: None,
        source: std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no instance API path registered for the selected version",
        ),
    })?;

    debug!("Loading LocalDB instance API from {}", path.display());
    let library = crate::platform::DynamicLibrary::load(path)?;
    Ok(Box::new(library))
}

/// Resolve one required export, failing with
/// [`LocalDbError::EntryPointNotFound`] if it is absent.
pub fn resolve_symbol(library: &dyn NativeLibrary, name: &'static str) -> Result<NonNull<c_void>> {
    library.symbol(name).ok_or_else(|| {
        warn!("LocalDB instance API does not export {}", name);
        LocalDbError::EntryPointNotFound { name }
    })
}
