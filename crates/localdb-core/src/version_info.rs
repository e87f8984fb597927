//! The `LocalDBVersionInfo` record returned by `LocalDBGetVersionInfo`.
//!
//! Layout: size (4), `wszVersion[44]` (88), `bExists` (4), then the four
//! version components (16), 112 bytes in total.

use crate::config::LocalDbLimits;
use crate::instance_info::{get_bool, get_u32, get_wide, put_bool, put_u32, put_wide};
use serde::Serialize;

/// Byte offsets of each field in the native record.
pub struct VersionInfoLayout;

impl VersionInfoLayout {
    pub const SIZE: usize = 0;
    pub const VERSION: usize = 4;
    pub const EXISTS: usize = 92;
    pub const MAJOR: usize = 96;
    pub const MINOR: usize = 100;
    pub const BUILD: usize = 104;
    pub const REVISION: usize = 108;
    pub const TOTAL: usize = 112;
}

pub const VERSION_INFO_SIZE: u32 = VersionInfoLayout::TOTAL as u32;

#[derive(Clone)]
#[repr(C, align(4))]
pub struct VersionInfoBuffer(pub [u8; VersionInfoLayout::TOTAL]);

impl VersionInfoBuffer {
    pub fn new() -> Self {
        let mut buffer = Self([0; VersionInfoLayout::TOTAL]);
        put_u32(&mut buffer.0, VersionInfoLayout::SIZE, VERSION_INFO_SIZE);
        buffer
    }
}

impl Default for VersionInfoBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Metadata of one installed engine version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    pub size: u32,
    pub version: String,
    pub exists: bool,
    pub major: u32,
    pub minor: u32,
    pub build: u32,
    pub revision: u32,
}

impl VersionInfo {
    pub fn decode(buffer: &VersionInfoBuffer) -> Self {
        type L = VersionInfoLayout;
        let b = &buffer.0;
        Self {
            size: get_u32(b, L::SIZE),
            version: get_wide(b, L::VERSION, LocalDbLimits::MAX_VERSION),
            exists: get_bool(b, L::EXISTS),
            major: get_u32(b, L::MAJOR),
            minor: get_u32(b, L::MINOR),
            build: get_u32(b, L::BUILD),
            revision: get_u32(b, L::REVISION),
        }
    }

    pub fn encode(&self) -> VersionInfoBuffer {
        type L = VersionInfoLayout;
        let mut buffer = VersionInfoBuffer([0; L::TOTAL]);
        let b = &mut buffer.0;
        put_u32(b, L::SIZE, self.size);
        put_wide(b, L::VERSION, LocalDbLimits::MAX_VERSION, &self.version);
        put_bool(b, L::EXISTS, self.exists);
        put_u32(b, L::MAJOR, self.major);
        put_u32(b, L::MINOR, self.minor);
        put_u32(b, L::BUILD, self.build);
        put_u32(b, L::REVISION, self.revision);
        buffer
    }
}
