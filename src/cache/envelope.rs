//! Envelope Codec Module
//!
//! Fixed binary header preceding every serialized payload.
//!
//! ```text
//! offset  size  field
//!      0     1  format version (1)
//!      1     1  is_transformed (0 / 1)
//!      2     4  created_at        u32 LE epoch seconds
//!      6     4  early_expires_at  u32 LE epoch seconds, 0 = absent
//!     10     4  expires_at        u32 LE epoch seconds, 0 = absent
//!     14     4  serializer id     ASCII
//!     18     n  payload
//! ```

use crate::error::{CacheError, Result};
use crate::serializer::SerializerId;

/// Current envelope format version.
pub const FORMAT_VERSION: u8 = 1;

/// Length of the fixed header in bytes.
pub const HEADER_LEN: usize = 18;

// == Envelope Header ==
/// Decoded header fields of an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeHeader {
    pub version: u8,
    pub is_transformed: bool,
    pub created_at: u64,
    pub early_expires_at: Option<u64>,
    pub expires_at: Option<u64>,
    pub serializer: SerializerId,
}

impl EnvelopeHeader {
    // == Encode ==
    /// Writes the header followed by `payload`.
    ///
    /// Fails with `InvalidArgument` if a timestamp does not fit in 32 bits.
    pub fn encode(&self, payload: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
        out.push(self.version);
        out.push(u8::from(self.is_transformed));
        out.extend_from_slice(&epoch_u32("created_at", Some(self.created_at))?.to_le_bytes());
        out.extend_from_slice(&epoch_u32("early_expires_at", self.early_expires_at)?.to_le_bytes());
        out.extend_from_slice(&epoch_u32("expires_at", self.expires_at)?.to_le_bytes());
        out.extend_from_slice(self.serializer.as_bytes());
        out.extend_from_slice(payload);
        Ok(out)
    }

    // == Decode ==
    /// Splits envelope bytes into header and payload.
    pub fn decode(bytes: &[u8]) -> Result<(Self, &[u8])> {
        if bytes.len() < HEADER_LEN {
            return Err(CacheError::CorruptEnvelope(format!(
                "envelope is {} bytes, header needs {}",
                bytes.len(),
                HEADER_LEN
            )));
        }

        let version = bytes[0];
        if version != FORMAT_VERSION {
            return Err(CacheError::CorruptEnvelope(format!(
                "unsupported format version {}",
                version
            )));
        }

        let header = Self {
            version,
            is_transformed: bytes[1] != 0,
            created_at: read_u32(bytes, 2).into(),
            early_expires_at: non_zero(read_u32(bytes, 6)),
            expires_at: non_zero(read_u32(bytes, 10)),
            serializer: SerializerId::from_bytes([bytes[14], bytes[15], bytes[16], bytes[17]])?,
        };

        Ok((header, &bytes[HEADER_LEN..]))
    }
}

// == Utility Functions ==
fn epoch_u32(field: &str, value: Option<u64>) -> Result<u32> {
    let value = value.unwrap_or(0);
    u32::try_from(value).map_err(|_| {
        CacheError::InvalidArgument(format!("{} {} does not fit the envelope", field, value))
    })
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

fn non_zero(value: u32) -> Option<u64> {
    (value != 0).then_some(u64::from(value))
}
