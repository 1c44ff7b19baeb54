//! JSON codec (`json`).

use crate::cache::CacheValue;
use crate::error::Result;
use crate::serializer::{Serializer, SerializerId};

/// Encodes values as tagged JSON documents.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn name(&self) -> SerializerId {
        SerializerId::JSON
    }

    fn pack(&self, value: &CacheValue) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn unpack(&self, bytes: &[u8]) -> Result<CacheValue> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
