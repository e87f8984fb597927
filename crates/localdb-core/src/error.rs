//! Error types for the LocalDB binding.
//!
//! Construction of a [`LocalDbApi`](crate::LocalDbApi) fails with one of
//! `NotInstalled`, `LoadFailed` or `EntryPointNotFound`; there is no partially
//! bound API. Result codes from the native calls themselves are returned raw by
//! the typed call surface and only become [`LocalDbError::NativeCall`] in the
//! [`client`](crate::client) layer.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the LocalDB binding.
#[derive(Debug, Error)]
pub enum LocalDbError {
    // Discovery errors
    #[error("LocalDB not installed: {reason}")]
    NotInstalled { reason: String },

    #[error("Registry error: {message}")]
    Registry {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    // Binding errors
    #[error("Failed to load LocalDB instance API library {path:?}: {source}")]
    LoadFailed {
        path: Option<PathBuf>,
        #[source]
        source: std::io::Error,
    },

    #[error("Entry point not found: {name}")]
    EntryPointNotFound { name: &'static str },

    // Call errors
    #[error("Invalid {field}: {message}")]
    InvalidArgument { field: &'static str, message: String },

    #[error("LocalDB call failed with {code:#010X}: {message}")]
    NativeCall { code: i32, message: String },
}

/// Result type alias for LocalDB operations.
pub type Result<T> = std::result::Result<T, LocalDbError>;

impl LocalDbError {
    /// Create a registry error from a raw Win32 status code.
    pub fn registry(message: impl Into<String>, status: u32) -> Self {
        LocalDbError::Registry {
            message: message.into(),
            source: Some(std::io::Error::from_raw_os_error(status as i32)),
        }
    }

    /// The native result code, if this error came from a native call.
    pub fn native_code(&self) -> Option<i32> {
        match self {
            LocalDbError::NativeCall { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Check if this error aborts binding construction.
    pub fn is_construction_failure(&self) -> bool {
        matches!(
            self,
            LocalDbError::NotInstalled { .. }
                | LocalDbError::LoadFailed { .. }
                | LocalDbError::EntryPointNotFound { .. }
                | LocalDbError::Registry { .. }
        )
    }
}
