//! Binary security identifiers passed to `LocalDBShareInstance`.

use crate::error::{LocalDbError, Result};

/// A validated binary SID.
///
/// Layout: revision (1 byte, always 1), sub-authority count `n` (1 byte,
/// at most 15), identifier authority (6 bytes), then `n` little-endian `u32`
/// sub-authorities. The native side reads exactly that many bytes, so the
/// length is checked against the count up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerSid(Vec<u8>);

impl OwnerSid {
    const REVISION: u8 = 1;
    const MAX_SUB_AUTHORITIES: u8 = 15;

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let invalid = |message: &str| LocalDbError::InvalidArgument {
            field: "owner_sid",
            message: message.to_string(),
        };
        if bytes.len() < 8 {
            return Err(invalid("shorter than the SID header"));
        }
        if bytes[0] != Self::REVISION {
            return Err(invalid("unsupported SID revision"));
        }
        let count = bytes[1];
        if count > Self::MAX_SUB_AUTHORITIES {
            return Err(invalid("too many sub-authorities"));
        }
        if bytes.len() != 8 + 4 * count as usize {
            return Err(invalid("length does not match sub-authority count"));
        }
        Ok(Self(bytes.to_vec()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Textual `S-1-...` form. Authorities of 2^32 and above are written as
    /// `0x` and twelve hex digits.
    pub fn to_sid_string(&self) -> String {
        let b = &self.0;
        let authority = b[2..8].iter().fold(0u64, |acc, &x| (acc << 8) | x as u64);
        let mut text = if authority > u64::from(u32::MAX) {
            format!("S-{}-{:#014X}", b[0], authority)
        } else {
            format!("S-{}-{}", b[0], authority)
        };
        for chunk in b[8..].chunks_exact(4) {
            let sub = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            text.push_str(&format!("-{}", sub));
        }
        text
    }
}
