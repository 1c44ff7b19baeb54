//! Serializer Module
//!
//! Value codecs addressed by a 4-character identifier, and the registry that
//! maps identifiers to codecs.

mod json;
mod msgpack;
mod registry;

use std::fmt;
use std::str::FromStr;

use crate::cache::CacheValue;
use crate::error::{CacheError, Result};

pub use json::JsonSerializer;
pub use msgpack::MsgPackSerializer;
pub use registry::SerializerRegistry;

// == Serializer Id ==
/// The 4-byte ASCII identifier stored in every envelope header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SerializerId([u8; 4]);

impl SerializerId {
    pub const JSON: SerializerId = SerializerId(*b"json");
    pub const MSGPACK: SerializerId = SerializerId(*b"msgp");

    /// Parses an identifier made of exactly 4 ASCII characters.
    pub fn new(name: &str) -> Result<Self> {
        let bytes: [u8; 4] = name.as_bytes().try_into().map_err(|_| {
            CacheError::InvalidArgument(format!(
                "serializer id must be 4 ASCII characters, got {:?}",
                name
            ))
        })?;
        if !bytes.is_ascii() {
            return Err(CacheError::InvalidArgument(format!(
                "serializer id must be 4 ASCII characters, got {:?}",
                name
            )));
        }
        Ok(Self(bytes))
    }

    /// Reads an identifier from envelope header bytes.
    pub fn from_bytes(bytes: [u8; 4]) -> Result<Self> {
        if !bytes.is_ascii() {
            return Err(CacheError::UnknownSerializer(format!("{:?}", bytes)));
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        // only ASCII bytes get in
        std::str::from_utf8(&self.0).unwrap_or("????")
    }
}

impl fmt::Display for SerializerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SerializerId {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

// == Serializer Trait ==
/// A value codec.
///
/// Implementations must be pure: `unpack(pack(v))` yields a value equal to `v`.
pub trait Serializer: Send + Sync {
    /// Identifier written into the envelope header.
    fn name(&self) -> SerializerId;

    /// Encodes a value into payload bytes.
    fn pack(&self, value: &CacheValue) -> Result<Vec<u8>>;

    /// Decodes payload bytes back into a value.
    fn unpack(&self, bytes: &[u8]) -> Result<CacheValue>;
}
