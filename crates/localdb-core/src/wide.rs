//! UTF-16 helpers for the native text convention.
//!
//! Input strings are passed as NUL-terminated UTF-16. Output buffers are
//! fixed-capacity arrays that the native side fills and terminates.

use crate::error::{LocalDbError, Result};

/// Encode `value` as a NUL-terminated UTF-16 string.
///
/// Interior NULs are rejected since the native side would silently cut the
/// string at the first one.
pub fn to_wide(field: &'static str, value: &str) -> Result<Vec<u16>> {
    if value.contains('\0') {
        return Err(LocalDbError::InvalidArgument {
            field,
            message: "contains an interior NUL".to_string(),
        });
    }
    Ok(value.encode_utf16().chain(std::iter::once(0)).collect())
}

/// Decode a UTF-16 buffer up to its first NUL (or its end).
pub fn from_wide(buffer: &[u16]) -> String {
    let len = buffer.iter().position(|&c| c == 0).unwrap_or(buffer.len());
    String::from_utf16_lossy(&buffer[..len])
}

/// Write `value` into a fixed-capacity buffer, truncating so that at least one
/// terminating NUL always fits. The rest of the buffer is zeroed.
///
/// Truncation never splits a surrogate pair: a character that does not fit
/// whole is dropped.
pub fn write_fixed(buffer: &mut [u16], value: &str) {
    buffer.fill(0);
    let max = buffer.len().saturating_sub(1);
    let mut written = 0;
    for ch in value.chars() {
        let width = ch.len_utf16();
        if written + width > max {
            break;
        }
        ch.encode_utf16(&mut buffer[written..written + width]);
        written += width;
    }
}

/// A fixed-width UTF-16 entry of the kind returned in arrays by
/// `LocalDBGetInstances` and `LocalDBGetVersions`.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct FixedWide<const N: usize>(pub [u16; N]);

impl<const N: usize> FixedWide<N> {
    pub const CAPACITY: usize = N;

    pub fn new(value: &str) -> Self {
        let mut entry = Self::default();
        write_fixed(&mut entry.0, value);
        entry
    }

    pub fn to_string_lossy(&self) -> String {
        from_wide(&self.0)
    }
}

impl<const N: usize> Default for FixedWide<N> {
    fn default() -> Self {
        Self([0; N])
    }
}

impl<const N: usize> std::fmt::Debug for FixedWide<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.to_string_lossy())
    }
}
