//! Error types for the cache core
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for entries, serializers, drivers and stores.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Missing key or value, or a malformed construction option
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Set options of an unrecognized shape
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// Value cannot be represented as a cache value
    #[error("Unsupported value type: {0}")]
    UnsupportedValueType(String),

    /// Envelope bytes are truncated or of an unknown format
    #[error("Corrupt envelope: {0}")]
    CorruptEnvelope(String),

    /// Serializer id is not registered
    #[error("Unknown serializer: {0}")]
    UnknownSerializer(String),

    /// Serializer id is already registered
    #[error("Duplicate serializer: {0}")]
    DuplicateSerializer(String),

    /// The store does not provide this operation
    #[error("Driver {driver} does not implement {method}()")]
    NotImplemented {
        driver: String,
        method: &'static str,
    },

    /// Serializer failed to pack or unpack a payload
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Opaque backend failure, passed through untouched
    #[error("Store error: {0}")]
    Store(#[source] anyhow::Error),
}

impl CacheError {
    /// Wraps any backend error as a [`CacheError::Store`].
    pub fn store<E>(err: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        CacheError::Store(err.into())
    }

    /// Returns true for errors raised by the backing store.
    pub fn is_store_error(&self) -> bool {
        matches!(self, CacheError::Store(_))
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

impl From<rmp_serde::encode::Error> for CacheError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

impl From<rmp_serde::decode::Error> for CacheError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache core.
pub type Result<T> = std::result::Result<T, CacheError>;
