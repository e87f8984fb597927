//! Flag and result-code constants of the LocalDB instance API.

/// Success.
pub const S_OK: i32 = 0;

/// `LocalDBFormatMessage`: truncate the message to the supplied buffer
/// instead of failing with [`LOCALDB_ERROR_INSUFFICIENT_BUFFER`].
pub const LOCALDB_TRUNCATE_ERR_MESSAGE: u32 = 0x0001;

/// `LocalDBStopInstance`: kill the engine process instead of a clean shutdown.
pub const LOCALDB_SHUTDOWN_KILL_PROCESS: u32 = 0x0001;
/// `LocalDBStopInstance`: `SHUTDOWN WITH NOWAIT`.
pub const LOCALDB_SHUTDOWN_WITH_NOWAIT: u32 = 0x0002;

pub const LOCALDB_ERROR_INVALID_PARAMETER: i32 = 0x89C5_0101_u32 as i32;
pub const LOCALDB_ERROR_UNKNOWN_INSTANCE: i32 = 0x89C5_0107_u32 as i32;
pub const LOCALDB_ERROR_UNKNOWN_VERSION: i32 = 0x89C5_010D_u32 as i32;
/// The output buffer was too small; the in/out length now holds the
/// required size.
pub const LOCALDB_ERROR_INSUFFICIENT_BUFFER: i32 = 0x89C5_0114_u32 as i32;

/// `true` for a success `HRESULT` (severity bit clear).
pub fn succeeded(code: i32) -> bool {
    code >= 0
}
