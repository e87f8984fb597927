//! Native signatures of the LocalDB instance API.
//!
//! Every export uses the C calling convention and returns an `HRESULT`.
//! `DWORD` maps to `u32`, `HRESULT` to `i32`, text is `WCHAR` (UTF-16).
//! This is the only place the ABI is spelled out; everything else goes through
//! [`LocalDbApi`](crate::LocalDbApi).
#![allow(unsafe_code)]

use crate::config::LocalDbLimits;
use crate::error::Result;
use crate::instance_info::InstanceInfoBuffer;
use crate::loader::{resolve_symbol, NativeLibrary};
use crate::version_info::VersionInfoBuffer;
use crate::wide::FixedWide;
use std::ffi::c_void;

/// One entry of the `LocalDBGetInstances` output array.
pub type InstanceNameEntry = FixedWide<{ LocalDbLimits::MAX_NAME }>;
/// One entry of the `LocalDBGetVersions` output array.
pub type VersionNameEntry = FixedWide<{ LocalDbLimits::MAX_VERSION }>;

pub type LocalDBCreateInstance =
    unsafe extern "C" fn(wsz_version: *const u16, instance_name: *const u16, flags: u32) -> i32;

pub type LocalDBDeleteInstance = unsafe extern "C" fn(instance_name: *const u16, flags: u32) -> i32;

pub type LocalDBFormatMessage = unsafe extern "C" fn(
    hr_localdb: i32,
    flags: u32,
    language_id: u32,
    wsz_message: *mut u16,
    lpcch_message: *mut u32,
) -> i32;

pub type LocalDBGetInstanceInfo = unsafe extern "C" fn(
    wsz_instance_name: *const u16,
    instance_info: *mut InstanceInfoBuffer,
    instance_info_size: u32,
) -> i32;

pub type LocalDBGetInstances =
    unsafe extern "C" fn(instance_names: *mut InstanceNameEntry, number_of_instances: *mut u32) -> i32;

pub type LocalDBGetVersionInfo = unsafe extern "C" fn(
    wsz_version_name: *const u16,
    version_info: *mut VersionInfoBuffer,
    version_info_size: u32,
) -> i32;

pub type LocalDBGetVersions =
    unsafe extern "C" fn(versions: *mut VersionNameEntry, number_of_versions: *mut u32) -> i32;

pub type LocalDBShareInstance = unsafe extern "C" fn(
    owner_sid: *const c_void,
    instance_private_name: *const u16,
    instance_shared_name: *const u16,
    flags: u32,
) -> i32;

pub type LocalDBStartInstance = unsafe extern "C" fn(
    instance_name: *const u16,
    flags: u32,
    wsz_sql_connection: *mut u16,
    lpcch_sql_connection: *mut u32,
) -> i32;

pub type LocalDBStartTracing = unsafe extern "C" fn() -> i32;

pub type LocalDBStopInstance =
    unsafe extern "C" fn(instance_name: *const u16, flags: u32, timeout: u32) -> i32;

pub type LocalDBStopTracing = unsafe extern "C" fn() -> i32;

pub type LocalDBUnshareInstance = unsafe extern "C" fn(instance_name: *const u16, flags: u32) -> i32;

macro_rules! exports {
    ($($field:ident: $ty:ident),* $(,)?) => {
        /// Resolved entry points, immutable once bound.
        #[derive(Clone, Copy)]
        pub(crate) struct Exports {
            $(pub(crate) $field: $ty,)*
        }

        impl Exports {
            /// Exported symbol names, in resolution order.
            pub const NAMES: &'static [&'static str] = &[$(stringify!($ty)),*];

            /// Resolve every export, stopping at the first missing one.
            pub(crate) fn resolve(library: &dyn NativeLibrary) -> Result<Self> {
                Ok(Self {
                    $($field: {
                        let address = resolve_symbol(library, stringify!($ty))?;
                        // SAFETY: the symbol is the library's export of that
                        // name, whose C signature is `$ty`.
                        unsafe { std::mem::transmute::<*mut c_void, $ty>(address.as_ptr()) }
                    },)*
                })
            }
        }
    };
}

exports! {
    create_instance: LocalDBCreateInstance,
    delete_instance: LocalDBDeleteInstance,
    format_message: LocalDBFormatMessage,
    get_instance_info: LocalDBGetInstanceInfo,
    get_instances: LocalDBGetInstances,
    get_version_info: LocalDBGetVersionInfo,
    get_versions: LocalDBGetVersions,
    share_instance: LocalDBShareInstance,
    start_instance: LocalDBStartInstance,
    start_tracing: LocalDBStartTracing,
    stop_instance: LocalDBStopInstance,
    stop_tracing: LocalDBStopTracing,
    unshare_instance: LocalDBUnshareInstance,
}
