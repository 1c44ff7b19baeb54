//! MessagePack codec (`msgp`).

use crate::cache::CacheValue;
use crate::error::Result;
use crate::serializer::{Serializer, SerializerId};

/// Encodes values as MessagePack maps.
///
/// Field names are kept (`to_vec_named`) so the tagged value layout decodes
/// the same way it does from JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct MsgPackSerializer;

impl Serializer for MsgPackSerializer {
    fn name(&self) -> SerializerId {
        SerializerId::MSGPACK
    }

    fn pack(&self, value: &CacheValue) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(value)?)
    }

    fn unpack(&self, bytes: &[u8]) -> Result<CacheValue> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}
