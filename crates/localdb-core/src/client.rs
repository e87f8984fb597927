//! A convenience layer over [`LocalDbApi`].
//!
//! This is where result codes get meaning: nonzero codes become
//! [`LocalDbError::NativeCall`] with the text from `LocalDBFormatMessage`, and
//! the two-phase sizing calls are driven until the buffer fits.

use crate::api::{HResult, LocalDbApi, SizedCall};
use crate::config::LocalDbLimits;
use crate::error::{LocalDbError, Result};
use crate::ffi::{InstanceNameEntry, VersionNameEntry};
use crate::flags::{succeeded, LOCALDB_ERROR_INSUFFICIENT_BUFFER, LOCALDB_TRUNCATE_ERR_MESSAGE};
use crate::instance_info::{InstanceInfo, InstanceInfoBuffer};
use crate::sid::OwnerSid;
use crate::version_info::{VersionInfo, VersionInfoBuffer};
use crate::wide::from_wide;
use tracing::{debug, warn};

/// Language id 0: let the native side pick the user's language.
const DEFAULT_LANGUAGE: u32 = 0;

/// Upper bound on sizing retries when the required size keeps changing
/// between calls (e.g. instances created concurrently).
const MAX_SIZING_ATTEMPTS: usize = 4;

/// High-level access to LocalDB built on a bound [`LocalDbApi`].
#[derive(Debug)]
pub struct LocalDb {
    api: LocalDbApi,
}

impl LocalDb {
    pub fn new(api: LocalDbApi) -> Self {
        Self { api }
    }

    /// Bind the installed LocalDB with default locator settings.
    pub fn connect() -> Result<Self> {
        Ok(Self::new(LocalDbApi::new()?))
    }

    pub fn api(&self) -> &LocalDbApi {
        &self.api
    }

    /// Text for a result code, falling back to the hex code if the native
    /// side cannot render it.
    pub fn message(&self, code: HResult) -> String {
        let fallback = || format!("LocalDB error {:#010X}", code);
        let sizing = self
            .api
            .format_message(code, LOCALDB_TRUNCATE_ERR_MESSAGE, DEFAULT_LANGUAGE, &mut []);
        let mut capacity = (sizing.count as usize).max(LocalDbLimits::MAX_PATH);

        for _ in 0..MAX_SIZING_ATTEMPTS {
            let mut buffer = vec![0u16; capacity];
            let call = self.api.format_message(
                code,
                LOCALDB_TRUNCATE_ERR_MESSAGE,
                DEFAULT_LANGUAGE,
                &mut buffer,
            );
            if call.code == LOCALDB_ERROR_INSUFFICIENT_BUFFER && call.count as usize > capacity {
                capacity = call.count as usize;
                continue;
            }
            if !succeeded(call.code) {
                warn!("LocalDBFormatMessage failed for {:#010X}: {:#010X}", code, call.code);
                return fallback();
            }
            let text = from_wide(&buffer);
            return text.trim_end().to_string();
        }
        fallback()
    }

    /// Turn a result code into `Ok(())` or a described error.
    pub fn check(&self, code: HResult) -> Result<()> {
        if succeeded(code) {
            Ok(())
        } else {
            Err(LocalDbError::NativeCall {
                code,
                message: self.message(code),
            })
        }
    }

    /// Names of all instances owned by the current user.
    pub fn instances(&self) -> Result<Vec<String>> {
        let entries = self.fetch_entries(|buf: &mut [InstanceNameEntry]| self.api.get_instances(buf))?;
        Ok(entries.iter().map(|e| e.to_string_lossy()).collect())
    }

    /// Installed engine versions.
    pub fn versions(&self) -> Result<Vec<String>> {
        let entries = self.fetch_entries(|buf: &mut [VersionNameEntry]| self.api.get_versions(buf))?;
        Ok(entries.iter().map(|e| e.to_string_lossy()).collect())
    }

    pub fn instance_info(&self, instance_name: &str) -> Result<InstanceInfo> {
        let mut buffer = InstanceInfoBuffer::new();
        let code = self.api.get_instance_info(instance_name, &mut buffer)?;
        self.check(code)?;
        Ok(InstanceInfo::decode(&buffer))
    }

    pub fn version_info(&self, version: &str) -> Result<VersionInfo> {
        let mut buffer = VersionInfoBuffer::new();
        let code = self.api.get_version_info(version, &mut buffer)?;
        self.check(code)?;
        Ok(VersionInfo::decode(&buffer))
    }

    pub fn create_instance(&self, version: &str, instance_name: &str) -> Result<()> {
        let code = self.api.create_instance(version, instance_name, 0)?;
        self.check(code)
    }

    pub fn delete_instance(&self, instance_name: &str) -> Result<()> {
        let code = self.api.delete_instance(instance_name, 0)?;
        self.check(code)
    }

    /// Start an instance and return its connection string (named pipe).
    pub fn start_instance(&self, instance_name: &str) -> Result<String> {
        let sizing = self.api.start_instance(instance_name, 0, &mut [])?;
        if !succeeded(sizing.code) && sizing.code != LOCALDB_ERROR_INSUFFICIENT_BUFFER {
            return Err(self.native_error(sizing.code));
        }
        let mut capacity = (sizing.count as usize).max(LocalDbLimits::MAX_PATH);

        for _ in 0..MAX_SIZING_ATTEMPTS {
            let mut buffer = vec![0u16; capacity];
            let call = self.api.start_instance(instance_name, 0, &mut buffer)?;
            if call.code == LOCALDB_ERROR_INSUFFICIENT_BUFFER && call.count as usize > capacity {
                capacity = call.count as usize;
                continue;
            }
            self.check(call.code)?;
            let connection = from_wide(&buffer);
            debug!("Started {} at {}", instance_name, connection);
            return Ok(connection);
        }
        Err(self.native_error(LOCALDB_ERROR_INSUFFICIENT_BUFFER))
    }

    /// Stop an instance, waiting at most `timeout_secs` (0 returns at once).
    pub fn stop_instance(&self, instance_name: &str, flags: u32, timeout_secs: u32) -> Result<()> {
        let code = self.api.stop_instance(instance_name, flags, timeout_secs)?;
        self.check(code)
    }

    pub fn share_instance(
        &self,
        owner: Option<&OwnerSid>,
        private_name: &str,
        shared_name: &str,
    ) -> Result<()> {
        let code = self.api.share_instance(owner, private_name, shared_name, 0)?;
        self.check(code)
    }

    pub fn unshare_instance(&self, instance_name: &str) -> Result<()> {
        let code = self.api.unshare_instance(instance_name, 0)?;
        self.check(code)
    }

    pub fn start_tracing(&self) -> Result<()> {
        self.check(self.api.start_tracing())
    }

    pub fn stop_tracing(&self) -> Result<()> {
        self.check(self.api.stop_tracing())
    }

    fn native_error(&self, code: HResult) -> LocalDbError {
        LocalDbError::NativeCall {
            code,
            message: self.message(code),
        }
    }

    /// Drive a two-phase array call: query the count with no buffer, then
    /// fetch into a buffer of that size, growing if the count moved.
    fn fetch_entries<T, F>(&self, mut call: F) -> Result<Vec<T>>
    where
        T: Default + Clone,
        F: FnMut(&mut [T]) -> SizedCall,
    {
        let sizing = call(&mut []);
        if !succeeded(sizing.code) && sizing.code != LOCALDB_ERROR_INSUFFICIENT_BUFFER {
            return Err(self.native_error(sizing.code));
        }
        let mut capacity = sizing.count as usize;

        for _ in 0..MAX_SIZING_ATTEMPTS {
            if capacity == 0 {
                return Ok(Vec::new());
            }
            let mut entries = vec![T::default(); capacity];
            let result = call(&mut entries);
            if result.code == LOCALDB_ERROR_INSUFFICIENT_BUFFER {
                capacity = result.count as usize;
                continue;
            }
            self.check(result.code)?;
            entries.truncate(result.count as usize);
            return Ok(entries);
        }
        Err(self.native_error(LOCALDB_ERROR_INSUFFICIENT_BUFFER))
    }
}
