//! The `LocalDBInstanceInfo` record.
//!
//! The native structure is sequential with 4-byte alignment: `DWORD`/`BOOL`
//! fields are 4 bytes, text fields are inline `WCHAR` arrays. Rather than
//! trusting a Rust struct to reproduce that, the byte offsets are spelled out
//! in [`InstanceInfoLayout`] and the record is encoded and decoded field by
//! field against an aligned byte buffer.
//!
//! | offset | size | field                    |
//! |-------:|-----:|--------------------------|
//! |      0 |    4 | `cbLocalDBInstanceInfoSize` |
//! |      4 |  258 | `wszInstanceName[129]`   |
//! |    264 |    4 | `bExists`                |
//! |    268 |    4 | `bConfigurationCorrupted`|
//! |    272 |    4 | `bIsRunning`             |
//! |    276 |   16 | `dwMajor` .. `dwRevision`|
//! |    292 |    8 | `ftLastStartDateUTC`     |
//! |    300 |  520 | `wszConnection[260]`     |
//! |    820 |    4 | `bIsShared`              |
//! |    824 |  258 | `wszSharedInstanceName[129]` |
//! |   1082 |  374 | `wszOwnerSID[187]`       |
//! |   1456 |    4 | `bIsAutomatic`           |
//!
//! Total size 1460 bytes (two bytes of padding after the instance name).

use crate::config::LocalDbLimits;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Byte offsets of each field in the native record.
pub struct InstanceInfoLayout;

impl InstanceInfoLayout {
    pub const SIZE: usize = 0;
    pub const INSTANCE_NAME: usize = 4;
    pub const EXISTS: usize = 264;
    pub const CONFIGURATION_CORRUPTED: usize = 268;
    pub const IS_RUNNING: usize = 272;
    pub const MAJOR: usize = 276;
    pub const MINOR: usize = 280;
    pub const BUILD: usize = 284;
    pub const REVISION: usize = 288;
    pub const LAST_START_UTC: usize = 292;
    pub const CONNECTION: usize = 300;
    pub const IS_SHARED: usize = 820;
    pub const SHARED_INSTANCE_NAME: usize = 824;
    pub const OWNER_SID: usize = 1082;
    pub const IS_AUTOMATIC: usize = 1456;
    /// Marshaled size of the whole record.
    pub const TOTAL: usize = 1460;
}

/// Marshaled size passed as `dwInstanceInfoSize` and stored in the size field.
pub const INSTANCE_INFO_SIZE: u32 = InstanceInfoLayout::TOTAL as u32;

/// The raw, correctly aligned memory handed to `LocalDBGetInstanceInfo`.
#[derive(Clone)]
#[repr(C, align(4))]
pub struct InstanceInfoBuffer(pub [u8; InstanceInfoLayout::TOTAL]);

impl InstanceInfoBuffer {
    /// A zeroed buffer with the size field already set.
    pub fn new() -> Self {
        let mut buffer = Self([0; InstanceInfoLayout::TOTAL]);
        put_u32(&mut buffer.0, InstanceInfoLayout::SIZE, INSTANCE_INFO_SIZE);
        buffer
    }

    pub fn size_field(&self) -> u32 {
        get_u32(&self.0, InstanceInfoLayout::SIZE)
    }
}

impl Default for InstanceInfoBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// A Windows `FILETIME`: 100-nanosecond intervals since 1601-01-01 UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
#[serde(transparent)]
pub struct FileTime(pub u64);

impl FileTime {
    const TICKS_PER_SECOND: u64 = 10_000_000;
    /// Seconds between 1601-01-01 and 1970-01-01.
    const UNIX_EPOCH_OFFSET_SECS: i64 = 11_644_473_600;

    pub fn from_parts(low: u32, high: u32) -> Self {
        Self(((high as u64) << 32) | low as u64)
    }

    pub fn low(self) -> u32 {
        self.0 as u32
    }

    pub fn high(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// The timestamp as UTC, or `None` for the zero (never started) value.
    pub fn to_utc(self) -> Option<DateTime<Utc>> {
        if self.0 == 0 {
            return None;
        }
        let secs = (self.0 / Self::TICKS_PER_SECOND) as i64 - Self::UNIX_EPOCH_OFFSET_SECS;
        let nanos = (self.0 % Self::TICKS_PER_SECOND) as u32 * 100;
        DateTime::from_timestamp(secs, nanos)
    }

    /// The `FILETIME` for `time`, or `None` if it falls before 1601 or past
    /// the last tick a `u64` can hold.
    pub fn from_utc(time: DateTime<Utc>) -> Option<Self> {
        let secs = time.timestamp().checked_add(Self::UNIX_EPOCH_OFFSET_SECS)?;
        let secs = u64::try_from(secs).ok()?;
        let ticks = secs
            .checked_mul(Self::TICKS_PER_SECOND)?
            .checked_add(u64::from(time.timestamp_subsec_nanos() / 100))?;
        Some(Self(ticks))
    }
}

/// Metadata of one LocalDB instance.
///
/// Consistency between the flags (e.g. a non-existent instance reporting all
/// other fields zeroed) is up to the native library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceInfo {
    pub size: u32,
    pub instance_name: String,
    pub exists: bool,
    pub configuration_corrupted: bool,
    pub is_running: bool,
    pub major: u32,
    pub minor: u32,
    pub build: u32,
    pub revision: u32,
    pub last_start_utc: FileTime,
    pub connection: String,
    pub is_shared: bool,
    pub shared_instance_name: String,
    #[serde(rename = "ownerSID")]
    pub owner_sid: String,
    pub is_automatic: bool,
}

impl Default for InstanceInfo {
    fn default() -> Self {
        Self {
            size: INSTANCE_INFO_SIZE,
            instance_name: String::new(),
            exists: false,
            configuration_corrupted: false,
            is_running: false,
            major: 0,
            minor: 0,
            build: 0,
            revision: 0,
            last_start_utc: FileTime::default(),
            connection: String::new(),
            is_shared: false,
            shared_instance_name: String::new(),
            owner_sid: String::new(),
            is_automatic: false,
        }
    }
}

impl InstanceInfo {
    /// Decode a record filled in by the native library.
    pub fn decode(buffer: &InstanceInfoBuffer) -> Self {
        type L = InstanceInfoLayout;
        let b = &buffer.0;
        Self {
            size: get_u32(b, L::SIZE),
            instance_name: get_wide(b, L::INSTANCE_NAME, LocalDbLimits::MAX_NAME),
            exists: get_bool(b, L::EXISTS),
            configuration_corrupted: get_bool(b, L::CONFIGURATION_CORRUPTED),
            is_running: get_bool(b, L::IS_RUNNING),
            major: get_u32(b, L::MAJOR),
            minor: get_u32(b, L::MINOR),
            build: get_u32(b, L::BUILD),
            revision: get_u32(b, L::REVISION),
            last_start_utc: FileTime::from_parts(
                get_u32(b, L::LAST_START_UTC),
                get_u32(b, L::LAST_START_UTC + 4),
            ),
            connection: get_wide(b, L::CONNECTION, LocalDbLimits::MAX_PATH),
            is_shared: get_bool(b, L::IS_SHARED),
            shared_instance_name: get_wide(b, L::SHARED_INSTANCE_NAME, LocalDbLimits::MAX_NAME),
            owner_sid: get_wide(b, L::OWNER_SID, LocalDbLimits::MAX_SID),
            is_automatic: get_bool(b, L::IS_AUTOMATIC),
        }
    }

    /// Encode into the native layout. Text longer than a field's capacity
    /// minus its terminator is truncated.
    pub fn encode(&self) -> InstanceInfoBuffer {
        type L = InstanceInfoLayout;
        let mut buffer = InstanceInfoBuffer([0; L::TOTAL]);
        let b = &mut buffer.0;
        put_u32(b, L::SIZE, self.size);
        put_wide(b, L::INSTANCE_NAME, LocalDbLimits::MAX_NAME, &self.instance_name);
        put_bool(b, L::EXISTS, self.exists);
        put_bool(b, L::CONFIGURATION_CORRUPTED, self.configuration_corrupted);
        put_bool(b, L::IS_RUNNING, self.is_running);
        put_u32(b, L::MAJOR, self.major);
        put_u32(b, L::MINOR, self.minor);
        put_u32(b, L::BUILD, self.build);
        put_u32(b, L::REVISION, self.revision);
        put_u32(b, L::LAST_START_UTC, self.last_start_utc.low());
        put_u32(b, L::LAST_START_UTC + 4, self.last_start_utc.high());
        put_wide(b, L::CONNECTION, LocalDbLimits::MAX_PATH, &self.connection);
        put_bool(b, L::IS_SHARED, self.is_shared);
        put_wide(b, L::SHARED_INSTANCE_NAME, LocalDbLimits::MAX_NAME, &self.shared_instance_name);
        put_wide(b, L::OWNER_SID, LocalDbLimits::MAX_SID, &self.owner_sid);
        put_bool(b, L::IS_AUTOMATIC, self.is_automatic);
        buffer
    }

    /// Dotted engine version of the instance.
    pub fn version_string(&self) -> String {
        format!("{}.{}.{}.{}", self.major, self.minor, self.build, self.revision)
    }

    /// Time of the last start, if the instance has ever been started.
    pub fn last_start(&self) -> Option<DateTime<Utc>> {
        self.last_start_utc.to_utc()
    }
}

// Field codecs shared with the version info record. Windows is little-endian
// on every architecture LocalDB ships for.

pub(crate) fn get_u32(b: &[u8], offset: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&b[offset..offset + 4]);
    u32::from_le_bytes(raw)
}

pub(crate) fn put_u32(b: &mut [u8], offset: usize, value: u32) {
    b[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

pub(crate) fn get_bool(b: &[u8], offset: usize) -> bool {
    get_u32(b, offset) != 0
}

pub(crate) fn put_bool(b: &mut [u8], offset: usize, value: bool) {
    put_u32(b, offset, value as u32);
}

pub(crate) fn get_wide(b: &[u8], offset: usize, capacity: usize) -> String {
    let units: Vec<u16> = b[offset..offset + capacity * 2]
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    crate::wide::from_wide(&units)
}

pub(crate) fn put_wide(b: &mut [u8], offset: usize, capacity: usize, value: &str) {
    let mut units = vec![0u16; capacity];
    crate::wide::write_fixed(&mut units, value);
    for (i, unit) in units.iter().enumerate() {
        let at = offset + i * 2;
        b[at..at + 2].copy_from_slice(&unit.to_le_bytes());
    }
}
