//! An in-process stand-in for the LocalDB instance API.
//!
//! The exports are Rust `extern "C"` functions with the native signatures.
//! They are stateless: two instances ("MSSQLLocalDB", "ProjectsV13"), two
//! versions ("11.0", "13.0"), and the name "missing" is unknown everywhere.
//!
//! A second set of exports misreports sizes to drive the sizing retries: the
//! `stale_*` ones answer the size query with too small a value, as if the data
//! grew between the two calls, and the `growing_*` ones need one more unit than
//! any buffer they are handed.
#![allow(unsafe_code)]
#![allow(dead_code)]

use localdb_core::flags::{
    LOCALDB_ERROR_INSUFFICIENT_BUFFER, LOCALDB_ERROR_INVALID_PARAMETER,
    LOCALDB_ERROR_UNKNOWN_INSTANCE, LOCALDB_ERROR_UNKNOWN_VERSION, LOCALDB_TRUNCATE_ERR_MESSAGE,
    S_OK,
};
use localdb_core::{
    FileTime, InstanceInfo, InstanceInfoBuffer, InstanceNameEntry, LocalDbApi, NativeLibrary,
    VersionInfo, VersionInfoBuffer, VersionNameEntry, INSTANCE_INFO_SIZE, VERSION_INFO_SIZE,
};
use std::collections::HashMap;
use std::ffi::c_void;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const INSTANCES: [&str; 2] = ["MSSQLLocalDB", "ProjectsV13"];
pub const VERSIONS: [&str; 2] = ["11.0", "13.0"];
pub const UNKNOWN: &str = "missing";
pub const PIPE: &str = r"np:\\.\pipe\LOCALDB#F365A78E\tsql\query";
pub const UNKNOWN_INSTANCE_TEXT: &str = "The specified LocalDB instance does not exist.";

/// A fake library exposing the exports above, optionally with some removed.
pub struct FakeLibrary {
    exports: HashMap<&'static str, usize>,
    released: Arc<AtomicBool>,
}

impl FakeLibrary {
    pub fn full() -> Self {
        let exports: [(&'static str, usize); 13] = [
            ("LocalDBCreateInstance", create_instance as usize),
            ("LocalDBDeleteInstance", delete_instance as usize),
            ("LocalDBFormatMessage", format_message as usize),
            ("LocalDBGetInstanceInfo", get_instance_info as usize),
            ("LocalDBGetInstances", get_instances as usize),
            ("LocalDBGetVersionInfo", get_version_info as usize),
            ("LocalDBGetVersions", get_versions as usize),
            ("LocalDBShareInstance", share_instance as usize),
            ("LocalDBStartInstance", start_instance as usize),
            ("LocalDBStartTracing", start_tracing as usize),
            ("LocalDBStopInstance", stop_instance as usize),
            ("LocalDBStopTracing", stop_tracing as usize),
            ("LocalDBUnshareInstance", unshare_instance as usize),
        ];
        Self {
            exports: exports.into_iter().collect(),
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn without(mut self, name: &str) -> Self {
        self.exports.remove(name);
        self
    }

    /// Replace (or add) the export called `name`.
    pub fn with(mut self, name: &'static str, export: usize) -> Self {
        self.exports.insert(name, export);
        self
    }

    /// Flag set once the library has been dropped.
    pub fn released_flag(&self) -> Arc<AtomicBool> {
        self.released.clone()
    }
}

impl NativeLibrary for FakeLibrary {
    fn symbol(&self, name: &str) -> Option<NonNull<c_void>> {
        self.exports
            .get(name)
            .and_then(|&address| NonNull::new(address as *mut c_void))
    }
}

impl Drop for FakeLibrary {
    fn drop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

/// Bind an API over the complete fake library.
pub fn fake_api() -> LocalDbApi {
    api_over(FakeLibrary::full())
}

pub fn api_over(library: FakeLibrary) -> LocalDbApi {
    LocalDbApi::bind("13.0", Box::new(library)).expect("fake library binds")
}

/// A connection string longer than the default connection buffer.
pub fn long_pipe() -> String {
    format!(r"np:\\.\pipe\LOCALDB#{}\tsql\query", "F".repeat(300))
}

/// A message longer than the default message buffer.
pub fn long_message() -> String {
    format!("LocalDB could not complete the request.{}", " Details follow.".repeat(30))
}

/// The info the fake reports for a known instance.
pub fn known_instance_info(name: &str) -> InstanceInfo {
    InstanceInfo {
        size: INSTANCE_INFO_SIZE,
        instance_name: name.to_string(),
        exists: true,
        configuration_corrupted: false,
        is_running: name == INSTANCES[0],
        major: 13,
        minor: 1,
        build: 4001,
        revision: 0,
        last_start_utc: FileTime(133_000_000_000_000_000),
        connection: PIPE.to_string(),
        is_shared: false,
        shared_instance_name: String::new(),
        owner_sid: "S-1-5-21-1004336348-1177238915-682003330-512".to_string(),
        is_automatic: name == INSTANCES[0],
    }
}

unsafe fn read_wide(ptr: *const u16) -> String {
    if ptr.is_null() {
        return String::new();
    }
    let mut len = 0;
    // SAFETY: callers pass NUL-terminated strings.
    unsafe {
        while *ptr.add(len) != 0 {
            len += 1;
        }
        String::from_utf16_lossy(std::slice::from_raw_parts(ptr, len))
    }
}

/// Shared two-phase text output: null buffer reports the size, a short one
/// fails (or truncates when allowed), a large enough one receives the text.
unsafe fn write_text(text: &str, buffer: *mut u16, len: *mut u32, truncate: bool) -> i32 {
    if len.is_null() {
        return LOCALDB_ERROR_INVALID_PARAMETER;
    }
    let units: Vec<u16> = text.encode_utf16().chain(std::iter::once(0)).collect();
    let required = units.len() as u32;
    // SAFETY: `len` is non-null and `buffer` is null or valid for `*len` units.
    unsafe {
        if buffer.is_null() {
            *len = required;
            return S_OK;
        }
        let capacity = *len;
        if capacity < required {
            if truncate && capacity > 0 {
                let keep = capacity as usize - 1;
                std::ptr::copy_nonoverlapping(units.as_ptr(), buffer, keep);
                *buffer.add(keep) = 0;
                *len = capacity;
                return S_OK;
            }
            *len = required;
            return LOCALDB_ERROR_INSUFFICIENT_BUFFER;
        }
        std::ptr::copy_nonoverlapping(units.as_ptr(), buffer, units.len());
        *len = required;
    }
    S_OK
}

unsafe fn write_entries<const N: usize>(
    names: &[&str],
    buffer: *mut localdb_core::wide::FixedWide<N>,
    count: *mut u32,
) -> i32 {
    if count.is_null() {
        return LOCALDB_ERROR_INVALID_PARAMETER;
    }
    let required = names.len() as u32;
    // SAFETY: `count` is non-null and `buffer` is null or valid for `*count`
    // entries.
    unsafe {
        if buffer.is_null() {
            *count = required;
            return S_OK;
        }
        if *count < required {
            *count = required;
            return LOCALDB_ERROR_INSUFFICIENT_BUFFER;
        }
        for (i, name) in names.iter().enumerate() {
            *buffer.add(i) = localdb_core::wide::FixedWide::new(name);
        }
        *count = required;
    }
    S_OK
}

fn instance_code(name: &str) -> i32 {
    if name.is_empty() {
        LOCALDB_ERROR_INVALID_PARAMETER
    } else if name == UNKNOWN {
        LOCALDB_ERROR_UNKNOWN_INSTANCE
    } else {
        S_OK
    }
}

unsafe extern "C" fn create_instance(version: *const u16, name: *const u16, _flags: u32) -> i32 {
    // SAFETY: the binding passes NUL-terminated strings.
    let (version, name) = unsafe { (read_wide(version), read_wide(name)) };
    if !VERSIONS.contains(&version.as_str()) {
        return LOCALDB_ERROR_UNKNOWN_VERSION;
    }
    if name.is_empty() {
        LOCALDB_ERROR_INVALID_PARAMETER
    } else {
        S_OK
    }
}

unsafe extern "C" fn delete_instance(name: *const u16, _flags: u32) -> i32 {
    // SAFETY: the binding passes NUL-terminated strings.
    instance_code(&unsafe { read_wide(name) })
}

unsafe extern "C" fn format_message(
    code: i32,
    flags: u32,
    _language_id: u32,
    message: *mut u16,
    len: *mut u32,
) -> i32 {
    let text = if code == LOCALDB_ERROR_UNKNOWN_INSTANCE {
        UNKNOWN_INSTANCE_TEXT.to_string()
    } else {
        format!("LocalDB reported error {:#010X}.", code)
    };
    let truncate = flags & LOCALDB_TRUNCATE_ERR_MESSAGE != 0;
    // SAFETY: forwarded from the binding's contract.
    unsafe { write_text(&text, message, len, truncate) }
}

unsafe extern "C" fn get_instance_info(
    name: *const u16,
    info: *mut InstanceInfoBuffer,
    size: u32,
) -> i32 {
    if info.is_null() || size != INSTANCE_INFO_SIZE {
        return LOCALDB_ERROR_INVALID_PARAMETER;
    }
    // SAFETY: `info` is non-null and sized as checked above.
    unsafe {
        if (*info).size_field() != INSTANCE_INFO_SIZE {
            return LOCALDB_ERROR_INVALID_PARAMETER;
        }
        let name = read_wide(name);
        if INSTANCES.contains(&name.as_str()) {
            *info = known_instance_info(&name).encode();
        } else {
            *info = InstanceInfo {
                instance_name: name,
                ..InstanceInfo::default()
            }
            .encode();
        }
    }
    S_OK
}

unsafe extern "C" fn get_instances(names: *mut InstanceNameEntry, count: *mut u32) -> i32 {
    // SAFETY: forwarded from the binding's contract.
    unsafe { write_entries(&INSTANCES, names, count) }
}

unsafe extern "C" fn get_version_info(
    version: *const u16,
    info: *mut VersionInfoBuffer,
    size: u32,
) -> i32 {
    if info.is_null() || size != VERSION_INFO_SIZE {
        return LOCALDB_ERROR_INVALID_PARAMETER;
    }
    // SAFETY: `info` is non-null and sized as checked above.
    unsafe {
        let version = read_wide(version);
        if !VERSIONS.contains(&version.as_str()) {
            return LOCALDB_ERROR_UNKNOWN_VERSION;
        }
        let major = if version == "11.0" { 11 } else { 13 };
        *info = VersionInfo {
            size: VERSION_INFO_SIZE,
            version,
            exists: true,
            major,
            minor: 0,
            build: 0,
            revision: 0,
        }
        .encode();
    }
    S_OK
}

unsafe extern "C" fn get_versions(versions: *mut VersionNameEntry, count: *mut u32) -> i32 {
    // SAFETY: forwarded from the binding's contract.
    unsafe { write_entries(&VERSIONS, versions, count) }
}

unsafe extern "C" fn share_instance(
    _owner_sid: *const c_void,
    private_name: *const u16,
    shared_name: *const u16,
    _flags: u32,
) -> i32 {
    // SAFETY: the binding passes NUL-terminated strings.
    let (private_name, shared_name) = unsafe { (read_wide(private_name), read_wide(shared_name)) };
    if shared_name.is_empty() {
        return LOCALDB_ERROR_INVALID_PARAMETER;
    }
    instance_code(&private_name)
}

unsafe extern "C" fn start_instance(
    name: *const u16,
    _flags: u32,
    connection: *mut u16,
    len: *mut u32,
) -> i32 {
    // SAFETY: the binding passes NUL-terminated strings.
    let code = instance_code(&unsafe { read_wide(name) });
    if code != S_OK {
        return code;
    }
    // SAFETY: forwarded from the binding's contract.
    unsafe { write_text(PIPE, connection, len, false) }
}

unsafe extern "C" fn start_tracing() -> i32 {
    S_OK
}

unsafe extern "C" fn stop_instance(name: *const u16, _flags: u32, _timeout: u32) -> i32 {
    // SAFETY: the binding passes NUL-terminated strings.
    instance_code(&unsafe { read_wide(name) })
}

unsafe extern "C" fn stop_tracing() -> i32 {
    S_OK
}

unsafe extern "C" fn unshare_instance(name: *const u16, _flags: u32) -> i32 {
    // SAFETY: the binding passes NUL-terminated strings.
    instance_code(&unsafe { read_wide(name) })
}

pub unsafe extern "C" fn stale_get_instances(names: *mut InstanceNameEntry, count: *mut u32) -> i32 {
    if count.is_null() {
        return LOCALDB_ERROR_INVALID_PARAMETER;
    }
    if names.is_null() {
        // SAFETY: `count` is non-null.
        unsafe { *count = INSTANCES.len() as u32 - 1 };
        return S_OK;
    }
    // SAFETY: forwarded from the binding's contract.
    unsafe { write_entries(&INSTANCES, names, count) }
}

pub unsafe extern "C" fn growing_get_instances(names: *mut InstanceNameEntry, count: *mut u32) -> i32 {
    if count.is_null() {
        return LOCALDB_ERROR_INVALID_PARAMETER;
    }
    // SAFETY: `count` is non-null.
    unsafe {
        if names.is_null() {
            *count = INSTANCES.len() as u32;
            return S_OK;
        }
        *count += 1;
    }
    LOCALDB_ERROR_INSUFFICIENT_BUFFER
}

pub unsafe extern "C" fn stale_start_instance(
    _name: *const u16,
    _flags: u32,
    connection: *mut u16,
    len: *mut u32,
) -> i32 {
    if len.is_null() {
        return LOCALDB_ERROR_INVALID_PARAMETER;
    }
    if connection.is_null() {
        // SAFETY: `len` is non-null.
        unsafe { *len = 1 };
        return S_OK;
    }
    // SAFETY: forwarded from the binding's contract.
    unsafe { write_text(&long_pipe(), connection, len, false) }
}

pub unsafe extern "C" fn growing_start_instance(
    _name: *const u16,
    _flags: u32,
    connection: *mut u16,
    len: *mut u32,
) -> i32 {
    if len.is_null() {
        return LOCALDB_ERROR_INVALID_PARAMETER;
    }
    // SAFETY: `len` is non-null.
    unsafe {
        if connection.is_null() {
            *len = PIPE.len() as u32 + 1;
            return S_OK;
        }
        *len += 1;
    }
    LOCALDB_ERROR_INSUFFICIENT_BUFFER
}

/// Ignores the truncation flag, so a short buffer always fails.
pub unsafe extern "C" fn stale_format_message(
    _code: i32,
    _flags: u32,
    _language_id: u32,
    message: *mut u16,
    len: *mut u32,
) -> i32 {
    if len.is_null() {
        return LOCALDB_ERROR_INVALID_PARAMETER;
    }
    if message.is_null() {
        // SAFETY: `len` is non-null.
        unsafe { *len = 1 };
        return S_OK;
    }
    // SAFETY: forwarded from the binding's contract.
    unsafe { write_text(&long_message(), message, len, false) }
}

pub unsafe extern "C" fn growing_format_message(
    _code: i32,
    _flags: u32,
    _language_id: u32,
    message: *mut u16,
    len: *mut u32,
) -> i32 {
    if len.is_null() {
        return LOCALDB_ERROR_INVALID_PARAMETER;
    }
    // SAFETY: `len` is non-null.
    unsafe {
        if message.is_null() {
            *len = 1;
            return S_OK;
        }
        *len += 1;
    }
    LOCALDB_ERROR_INSUFFICIENT_BUFFER
}
