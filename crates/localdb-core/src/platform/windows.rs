//! Windows registry backend.
#![allow(unsafe_code)]

use crate::config::{RegistryConfig, RegistryView};
use crate::error::{LocalDbError, Result};
use crate::locator::VersionRegistry;
use std::ffi::{c_void, OsString};
use std::os::windows::ffi::OsStringExt;
use std::path::PathBuf;
use std::ptr;
use tracing::debug;
use windows_sys::Win32::Foundation::{
    ERROR_FILE_NOT_FOUND, ERROR_MORE_DATA, ERROR_NO_MORE_ITEMS, ERROR_SUCCESS,
};
use windows_sys::Win32::System::Registry::{
    RegCloseKey, RegEnumKeyExW, RegGetValueW, RegOpenKeyExW, HKEY, HKEY_LOCAL_MACHINE, KEY_READ,
    KEY_WOW64_32KEY, RRF_RT_REG_SZ,
};

/// Registry key names are limited to 255 characters.
const MAX_KEY_NAME: usize = 256;

fn wide_z(value: &str) -> Vec<u16> {
    value.encode_utf16().chain(std::iter::once(0)).collect()
}

/// An open registry key, closed on drop.
struct RegKey(HKEY);

impl RegKey {
    /// Open `subkey` below `parent` for reading. `Ok(None)` if it does not exist.
    fn open(parent: HKEY, subkey: &str, view: RegistryView) -> Result<Option<Self>> {
        let name = wide_z(subkey);
        let mut access = KEY_READ;
        if view == RegistryView::Registry32 {
            access |= KEY_WOW64_32KEY;
        }
        let mut handle: HKEY = ptr::null_mut();
        // SAFETY: `name` is NUL-terminated and outlives the call; `handle` is a
        // valid out-pointer.
        let status = unsafe { RegOpenKeyExW(parent, name.as_ptr(), 0, access, &mut handle) };
        match status {
            ERROR_SUCCESS => Ok(Some(Self(handle))),
            ERROR_FILE_NOT_FOUND => Ok(None),
            other => Err(LocalDbError::registry(
                format!("failed to open registry key {}", subkey),
                other,
            )),
        }
    }

    fn subkey_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut index = 0u32;
        loop {
            let mut buffer = [0u16; MAX_KEY_NAME];
            let mut len = buffer.len() as u32;
            // SAFETY: `buffer` holds `len` units; the optional out-parameters
            // are null, which the API permits.
            let status = unsafe {
                RegEnumKeyExW(
                    self.0,
                    index,
                    buffer.as_mut_ptr(),
                    &mut len,
                    ptr::null(),
                    ptr::null_mut(),
                    ptr::null_mut(),
                    ptr::null_mut(),
                )
            };
            match status {
                ERROR_SUCCESS => {
                    names.push(String::from_utf16_lossy(&buffer[..len as usize]));
                    index += 1;
                }
                ERROR_NO_MORE_ITEMS => break,
                other => {
                    return Err(LocalDbError::registry(
                        "failed to enumerate installed LocalDB versions",
                        other,
                    ))
                }
            }
        }
        Ok(names)
    }

    /// Read a `REG_SZ` value of `subkey`. `Ok(None)` if key or value is missing.
    fn string_value(&self, subkey: &str, value: &str) -> Result<Option<OsString>> {
        let subkey_w = wide_z(subkey);
        let value_w = wide_z(value);
        let mut data: Vec<u16> = Vec::new();
        let mut byte_len = 0u32;

        loop {
            let data_ptr = if data.is_empty() {
                ptr::null_mut()
            } else {
                data.as_mut_ptr() as *mut c_void
            };
            // SAFETY: names are NUL-terminated; `data_ptr` is null or points to
            // `byte_len` writable bytes.
            let status = unsafe {
                RegGetValueW(
                    self.0,
                    subkey_w.as_ptr(),
                    value_w.as_ptr(),
                    RRF_RT_REG_SZ,
                    ptr::null_mut(),
                    data_ptr,
                    &mut byte_len,
                )
            };
            match status {
                ERROR_SUCCESS if !data.is_empty() => break,
                ERROR_SUCCESS | ERROR_MORE_DATA => {
                    // Size only: round up to whole units and retry.
                    data = vec![0u16; (byte_len as usize).div_ceil(2).max(1)];
                    byte_len = (data.len() * 2) as u32;
                }
                ERROR_FILE_NOT_FOUND => return Ok(None),
                other => {
                    return Err(LocalDbError::registry(
                        format!("failed to read {}\\{}", subkey, value),
                        other,
                    ))
                }
            }
        }

        let units = byte_len as usize / 2;
        let text = &data[..units.min(data.len())];
        let end = text.iter().position(|&c| c == 0).unwrap_or(text.len());
        Ok(Some(OsString::from_wide(&text[..end])))
    }
}

impl Drop for RegKey {
    fn drop(&mut self) {
        // SAFETY: the handle came from a successful RegOpenKeyExW and is
        // closed exactly once.
        unsafe {
            RegCloseKey(self.0);
        }
    }
}

/// Reads the installed-versions namespace from `HKEY_LOCAL_MACHINE`.
#[derive(Debug, Clone, Copy)]
pub struct SystemRegistry {
    view: RegistryView,
}

impl SystemRegistry {
    pub fn new(view: RegistryView) -> Self {
        Self { view }
    }

    fn versions_key(&self) -> Result<Option<RegKey>> {
        RegKey::open(HKEY_LOCAL_MACHINE, RegistryConfig::INSTALLED_VERSIONS_KEY, self.view)
    }
}

impl VersionRegistry for SystemRegistry {
    fn version_keys(&self) -> Result<Option<Vec<String>>> {
        let Some(key) = self.versions_key()? else {
            debug!("{} not present", RegistryConfig::INSTALLED_VERSIONS_KEY);
            return Ok(None);
        };
        key.subkey_names().map(Some)
    }

    fn instance_api_path(&self, version_key: &str) -> Result<Option<PathBuf>> {
        let Some(key) = self.versions_key()? else {
            return Ok(None);
        };
        Ok(key
            .string_value(version_key, RegistryConfig::INSTANCE_API_PATH_VALUE)?
            .map(PathBuf::from))
    }
}
