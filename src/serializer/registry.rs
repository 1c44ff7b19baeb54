//! Serializer Registry
//!
//! Maps serializer ids to codecs. Populated up front, then shared read-only.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{CacheError, Result};
use crate::serializer::{JsonSerializer, MsgPackSerializer, Serializer, SerializerId};

// == Serializer Registry ==
#[derive(Default, Clone)]
pub struct SerializerRegistry {
    serializers: HashMap<SerializerId, Arc<dyn Serializer>>,
}

impl SerializerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the bundled `json` and `msgp` codecs.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.serializers.insert(SerializerId::JSON, Arc::new(JsonSerializer));
        registry.serializers.insert(SerializerId::MSGPACK, Arc::new(MsgPackSerializer));
        registry
    }

    // == Register ==
    /// Adds a codec under its own name.
    ///
    /// Fails with `DuplicateSerializer` if the name is taken.
    pub fn register(&mut self, serializer: Arc<dyn Serializer>) -> Result<()> {
        let id = serializer.name();
        if self.serializers.contains_key(&id) {
            return Err(CacheError::DuplicateSerializer(id.to_string()));
        }
        self.serializers.insert(id, serializer);
        Ok(())
    }

    // == Get ==
    /// Looks up a codec, failing with `UnknownSerializer` if absent.
    pub fn get(&self, id: &SerializerId) -> Result<Arc<dyn Serializer>> {
        self.serializers
            .get(id)
            .cloned()
            .ok_or_else(|| CacheError::UnknownSerializer(id.to_string()))
    }

    pub fn contains(&self, id: &SerializerId) -> bool {
        self.serializers.contains_key(id)
    }

    /// Registered ids in sorted order.
    pub fn ids(&self) -> Vec<SerializerId> {
        let mut ids: Vec<SerializerId> = self.serializers.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.serializers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.serializers.is_empty()
    }
}

impl std::fmt::Debug for SerializerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerializerRegistry")
            .field("serializers", &self.ids())
            .finish()
    }
}
