//! Dynamic library backend built on `libloading`.
#![allow(unsafe_code)]

use crate::error::{LocalDbError, Result};
use crate::loader::NativeLibrary;
use std::ffi::c_void;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use tracing::debug;

/// A loaded library, released when dropped.
#[derive(Debug)]
pub struct DynamicLibrary {
    library: libloading::Library,
    path: PathBuf,
}

impl DynamicLibrary {
    /// Load the library at `path`.
    ///
    /// On Windows dependent DLLs are searched in the default safe directories
    /// only, never the current directory.
    pub fn load(path: &Path) -> Result<Self> {
        let library = open(path).map_err(|e| LocalDbError::LoadFailed {
            path: Some(path.to_path_buf()),
            source: std::io::Error::other(e),
        })?;
        debug!("Loaded {}", path.display());
        Ok(Self {
            library,
            path: path.to_path_buf(),
        })
    }
}

#[cfg(windows)]
fn open(path: &Path) -> std::result::Result<libloading::Library, libloading::Error> {
    use libloading::os::windows::{Library, LOAD_LIBRARY_SEARCH_DEFAULT_DIRS};

    // SAFETY: the instance API library has no initialization routines with
    // preconditions on the caller.
    unsafe { Library::load_with_flags(path, LOAD_LIBRARY_SEARCH_DEFAULT_DIRS) }.map(Into::into)
}

#[cfg(not(windows))]
fn open(path: &Path) -> std::result::Result<libloading::Library, libloading::Error> {
    // SAFETY: only the instance API library (or a stand-in with no
    // initialization routines) is loaded here.
    unsafe { libloading::Library::new(path) }
}

impl NativeLibrary for DynamicLibrary {
    fn symbol(&self, name: &str) -> Option<NonNull<c_void>> {
        // SAFETY: the export is read as an untyped address and never called
        // here; the caller casts it to the documented signature.
        let address = unsafe { self.library.get::<*mut c_void>(name.as_bytes()) }.ok()?;
        NonNull::new(*address)
    }
}

impl Drop for DynamicLibrary {
    fn drop(&mut self) {
        debug!("Releasing {}", self.path.display());
    }
}
