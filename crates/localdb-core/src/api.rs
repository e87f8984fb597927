//! The typed call surface over the LocalDB instance API.
//!
//! [`LocalDbApi`] owns the loaded library and the resolved entry points.
//! Every method forwards to exactly one native call and hands back the raw
//! `HRESULT`; interpreting codes and retrying undersized buffers is left to
//! the caller (see [`client`](crate::client)).
#![allow(unsafe_code)]

use crate::config::LocatorConfig;
use crate::error::Result;
use crate::ffi::{Exports, InstanceNameEntry, VersionNameEntry};
use crate::instance_info::{InstanceInfoBuffer, INSTANCE_INFO_SIZE};
use crate::loader::{load_library, NativeLibrary};
use crate::locator::{locate, VersionRegistry};
use crate::platform::SystemRegistry;
use crate::sid::OwnerSid;
use crate::version_info::{VersionInfoBuffer, VERSION_INFO_SIZE};
use crate::wide::to_wide;
use std::ffi::c_void;
use std::path::Path;
use std::ptr;
use tracing::{debug, info};

/// A native `HRESULT`.
pub type HResult = i32;

/// Outcome of a call with an in/out count or length parameter.
///
/// `count` is what the native side wrote back: the number of items or
/// characters produced, or the size required when the buffer was too small.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizedCall {
    pub code: HResult,
    pub count: u32,
}

/// A bound LocalDB instance API.
///
/// Construction locates, loads and resolves everything up front; afterwards
/// the value is immutable. The library is released when the value is dropped.
/// Thread safety of the calls is that of the native library.
pub struct LocalDbApi {
    exports: Exports,
    api_version: String,
    // Dropped last so no entry point outlives the module it points into.
    _library: Box<dyn NativeLibrary>,
}

impl std::fmt::Debug for LocalDbApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalDbApi")
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

fn len_u32(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

fn out_ptr<T>(buffer: &mut [T]) -> *mut T {
    if buffer.is_empty() {
        ptr::null_mut()
    } else {
        buffer.as_mut_ptr()
    }
}

impl LocalDbApi {
    /// Bind the installed LocalDB using the default locator settings.
    pub fn new() -> Result<Self> {
        Self::with_config(LocatorConfig::default())
    }

    /// Bind the installed LocalDB, reading the registry view and applying the
    /// version selection from `config`.
    pub fn with_config(config: LocatorConfig) -> Result<Self> {
        let registry = SystemRegistry::new(config.view);
        Self::discover(&registry, &config, load_library)
    }

    /// Locate through `registry`, load with `load`, then resolve the exports.
    ///
    /// `load` is only invoked once a version has been selected.
    pub fn discover<F>(registry: &dyn VersionRegistry, config: &LocatorConfig, load: F) -> Result<Self>
    where
        F: FnOnce(Option<&Path>) -> Result<Box<dyn NativeLibrary>>,
    {
        let located = locate(registry, config)?;
        let library = load(located.path.as_deref())?;
        Self::bind(located.api_version, library)
    }

    /// Resolve all exports from an already loaded library.
    pub fn bind(api_version: impl Into<String>, library: Box<dyn NativeLibrary>) -> Result<Self> {
        let api_version = api_version.into();
        let exports = Exports::resolve(library.as_ref())?;
        info!(
            "Bound LocalDB instance API {} ({} entry points)",
            api_version,
            Exports::NAMES.len()
        );
        Ok(Self {
            exports,
            api_version,
            _library: library,
        })
    }

    /// The installed-versions key the API was bound from.
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Names of the entry points every bound API resolves.
    pub fn entry_points() -> &'static [&'static str] {
        Exports::NAMES
    }

    /// `LocalDBCreateInstance`: create `instance_name` running engine `version`.
    pub fn create_instance(&self, version: &str, instance_name: &str, flags: u32) -> Result<HResult> {
        let version = to_wide("version", version)?;
        let name = to_wide("instance_name", instance_name)?;
        // SAFETY: both strings are NUL-terminated and live across the call.
        Ok(unsafe { (self.exports.create_instance)(version.as_ptr(), name.as_ptr(), flags) })
    }

    /// `LocalDBDeleteInstance`.
    pub fn delete_instance(&self, instance_name: &str, flags: u32) -> Result<HResult> {
        let name = to_wide("instance_name", instance_name)?;
        // SAFETY: `name` is NUL-terminated and lives across the call.
        Ok(unsafe { (self.exports.delete_instance)(name.as_ptr(), flags) })
    }

    /// `LocalDBFormatMessage`: render `code` as text into `message`.
    ///
    /// The buffer capacity (in characters, terminator included) is passed as
    /// the in-length. An empty buffer is passed as null, which makes the call
    /// a pure size query.
    pub fn format_message(
        &self,
        code: HResult,
        flags: u32,
        language_id: u32,
        message: &mut [u16],
    ) -> SizedCall {
        let mut count = len_u32(message.len());
        // SAFETY: the pointer is null or valid for `count` units.
        let code = unsafe {
            (self.exports.format_message)(code, flags, language_id, out_ptr(message), &mut count)
        };
        SizedCall { code, count }
    }

    /// `LocalDBGetInstanceInfo`: fill `info` for `instance_name`.
    ///
    /// The size field of `info` is reset to the marshaled size before the
    /// call, as the native side rejects any other value.
    pub fn get_instance_info(&self, instance_name: &str, info: &mut InstanceInfoBuffer) -> Result<HResult> {
        let name = to_wide("instance_name", instance_name)?;
        *info = InstanceInfoBuffer::new();
        // SAFETY: `info` is a 4-byte aligned buffer of exactly
        // INSTANCE_INFO_SIZE bytes.
        Ok(unsafe { (self.exports.get_instance_info)(name.as_ptr(), info, INSTANCE_INFO_SIZE) })
    }

    /// `LocalDBGetInstances`: list instance names into `names`.
    pub fn get_instances(&self, names: &mut [InstanceNameEntry]) -> SizedCall {
        let mut count = len_u32(names.len());
        // SAFETY: the pointer is null or valid for `count` fixed-width entries.
        let code = unsafe { (self.exports.get_instances)(out_ptr(names), &mut count) };
        SizedCall { code, count }
    }

    /// `LocalDBGetVersionInfo`: fill `info` for engine `version`.
    pub fn get_version_info(&self, version: &str, info: &mut VersionInfoBuffer) -> Result<HResult> {
        let version = to_wide("version", version)?;
        *info = VersionInfoBuffer::new();
        // SAFETY: `info` is a 4-byte aligned buffer of exactly
        // VERSION_INFO_SIZE bytes.
        Ok(unsafe { (self.exports.get_version_info)(version.as_ptr(), info, VERSION_INFO_SIZE) })
    }

    /// `LocalDBGetVersions`: list installed engine versions into `versions`.
    pub fn get_versions(&self, versions: &mut [VersionNameEntry]) -> SizedCall {
        let mut count = len_u32(versions.len());
        // SAFETY: the pointer is null or valid for `count` fixed-width entries.
        let code = unsafe { (self.exports.get_versions)(out_ptr(versions), &mut count) };
        SizedCall { code, count }
    }

    /// `LocalDBShareInstance`: publish `private_name` as `shared_name`.
    ///
    /// `owner` of `None` is passed as a null SID pointer.
    pub fn share_instance(
        &self,
        owner: Option<&OwnerSid>,
        private_name: &str,
        shared_name: &str,
        flags: u32,
    ) -> Result<HResult> {
        let private_name = to_wide("private_name", private_name)?;
        let shared_name = to_wide("shared_name", shared_name)?;
        let sid = owner.map_or(ptr::null(), |sid| sid.as_bytes().as_ptr() as *const c_void);
        // SAFETY: strings are NUL-terminated; `sid` is null or a validated SID
        // whose length matches its sub-authority count.
        Ok(unsafe {
            (self.exports.share_instance)(sid, private_name.as_ptr(), shared_name.as_ptr(), flags)
        })
    }

    /// `LocalDBStartInstance`: start `instance_name`, writing its connection
    /// string into `connection`.
    pub fn start_instance(&self, instance_name: &str, flags: u32, connection: &mut [u16]) -> Result<SizedCall> {
        let name = to_wide("instance_name", instance_name)?;
        let mut count = len_u32(connection.len());
        // SAFETY: `name` is NUL-terminated; the output pointer is null or
        // valid for `count` units.
        let code = unsafe {
            (self.exports.start_instance)(name.as_ptr(), flags, out_ptr(connection), &mut count)
        };
        Ok(SizedCall { code, count })
    }

    /// `LocalDBStartTracing`.
    pub fn start_tracing(&self) -> HResult {
        debug!("Enabling LocalDB tracing");
        // SAFETY: takes no arguments.
        unsafe { (self.exports.start_tracing)() }
    }

    /// `LocalDBStopInstance`. `timeout` (seconds) is passed through unchanged.
    pub fn stop_instance(&self, instance_name: &str, flags: u32, timeout: u32) -> Result<HResult> {
        let name = to_wide("instance_name", instance_name)?;
        // SAFETY: `name` is NUL-terminated and lives across the call.
        Ok(unsafe { (self.exports.stop_instance)(name.as_ptr(), flags, timeout) })
    }

    /// `LocalDBStopTracing`.
    pub fn stop_tracing(&self) -> HResult {
        debug!("Disabling LocalDB tracing");
        // SAFETY: takes no arguments.
        unsafe { (self.exports.stop_tracing)() }
    }

    /// `LocalDBUnshareInstance`.
    pub fn unshare_instance(&self, instance_name: &str, flags: u32) -> Result<HResult> {
        let name = to_wide("instance_name", instance_name)?;
        // SAFETY: `name` is NUL-terminated and lives across the call.
        Ok(unsafe { (self.exports.unshare_instance)(name.as_ptr(), flags) })
    }
}
