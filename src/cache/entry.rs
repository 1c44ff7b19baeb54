//! Cache Entry Module
//!
//! Defines one cached value with its expiry metadata and its lazily computed
//! envelope.

use chrono::Utc;

use crate::cache::envelope::{EnvelopeHeader, FORMAT_VERSION};
use crate::cache::CacheValue;
use crate::error::{CacheError, Result};
use crate::serializer::{SerializerId, SerializerRegistry};

// == Entry Options ==
/// Optional metadata for [`CacheEntry::new`].
#[derive(Debug, Clone, Default)]
pub struct EntryOptions {
    /// Creation time, epoch seconds (defaults to now)
    pub created_at: Option<u64>,
    /// Hard expiry, epoch seconds
    pub expires_at: Option<u64>,
    /// Start of the soft-expiry window, epoch seconds
    pub early_expires_at: Option<u64>,
    /// Codec for the value (defaults to `json`)
    pub serializer: Option<SerializerId>,
    /// Whether the key went through a key transform
    pub is_transformed: bool,
}

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    key: String,
    value: CacheValue,
    created_at: u64,
    expires_at: Option<u64>,
    early_expires_at: Option<u64>,
    serializer: SerializerId,
    is_transformed: bool,
    /// Cleared by every metadata setter
    envelope: Option<Vec<u8>>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry.
    ///
    /// # Errors
    /// - `InvalidArgument` if the key is empty, the value is absent, an expiry
    ///   is `0` (the envelope reserves it for "absent"), or the soft window
    ///   ends after the hard expiry
    /// - `UnsupportedValueType` if no bundled codec can represent the value
    pub fn new(
        key: impl Into<String>,
        value: impl Into<CacheValue>,
        options: EntryOptions,
    ) -> Result<Self> {
        let key = key.into();
        if key.is_empty() {
            return Err(CacheError::InvalidArgument("a key is required".to_string()));
        }

        let value = value.into();
        value.validate()?;

        check_not_zero("expires_at", options.expires_at)?;
        check_not_zero("early_expires_at", options.early_expires_at)?;
        if let (Some(early), Some(expires)) = (options.early_expires_at, options.expires_at) {
            if early > expires {
                return Err(CacheError::InvalidArgument(format!(
                    "early_expires_at {} is after expires_at {}",
                    early, expires
                )));
            }
        }

        Ok(Self {
            key,
            value,
            created_at: options.created_at.unwrap_or_else(current_epoch_seconds),
            expires_at: options.expires_at,
            early_expires_at: options.early_expires_at,
            serializer: options.serializer.unwrap_or(SerializerId::JSON),
            is_transformed: options.is_transformed,
            envelope: None,
        })
    }

    // == Decode ==
    /// Rebuilds an entry from envelope bytes.
    ///
    /// The input bytes become the entry's cached envelope.
    pub fn decode(key: impl Into<String>, bytes: &[u8], registry: &SerializerRegistry) -> Result<Self> {
        let (header, payload) = EnvelopeHeader::decode(bytes)?;
        let value = registry.get(&header.serializer)?.unpack(payload)?;

        Ok(Self {
            key: key.into(),
            value,
            created_at: header.created_at,
            expires_at: header.expires_at,
            early_expires_at: header.early_expires_at,
            serializer: header.serializer,
            is_transformed: header.is_transformed,
            envelope: Some(bytes.to_vec()),
        })
    }

    // == Accessors ==
    /// The caller-facing key (never the store-transformed one).
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The cached value.
    pub fn value(&self) -> &CacheValue {
        &self.value
    }

    /// Consumes the entry, returning its value.
    pub fn into_value(self) -> CacheValue {
        self.value
    }

    /// Creation time, epoch seconds.
    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    /// Hard expiry, epoch seconds; `None` never expires.
    pub fn expires_at(&self) -> Option<u64> {
        self.expires_at
    }

    /// Start of the soft-expiry window, epoch seconds.
    pub fn early_expires_at(&self) -> Option<u64> {
        self.early_expires_at
    }

    /// Codec the payload is packed with.
    pub fn serializer(&self) -> SerializerId {
        self.serializer
    }

    /// Whether the store rewrote the key before writing.
    pub fn is_transformed(&self) -> bool {
        self.is_transformed
    }

    /// The envelope as last computed, if still valid.
    pub fn cached_envelope(&self) -> Option<&[u8]> {
        self.envelope.as_deref()
    }

    // == Setters ==
    /// Changes the hard expiry.
    ///
    /// A soft-window start later than the new expiry is pulled back to it.
    /// A `0` expiry is rejected with `InvalidArgument`.
    pub fn set_expires_at(&mut self, expires_at: Option<u64>) -> Result<()> {
        check_not_zero("expires_at", expires_at)?;
        self.expires_at = expires_at;
        if let (Some(early), Some(expires)) = (self.early_expires_at, expires_at) {
            if early > expires {
                self.early_expires_at = Some(expires);
            }
        }
        self.envelope = None;
        Ok(())
    }

    /// Changes the start of the soft-expiry window.
    pub fn set_early_expires_at(&mut self, early_expires_at: Option<u64>) -> Result<()> {
        check_not_zero("early_expires_at", early_expires_at)?;
        if let (Some(early), Some(expires)) = (early_expires_at, self.expires_at) {
            if early > expires {
                return Err(CacheError::InvalidArgument(format!(
                    "early_expires_at {} is after expires_at {}",
                    early, expires
                )));
            }
        }
        self.early_expires_at = early_expires_at;
        self.envelope = None;
        Ok(())
    }

    /// Changes the codec used by the next pack.
    pub fn set_serializer(&mut self, serializer: SerializerId) {
        self.serializer = serializer;
        self.envelope = None;
    }

    // == Pack ==
    /// Returns the envelope, computing it only if there is none cached.
    pub fn pack(&mut self, registry: &SerializerRegistry) -> Result<&[u8]> {
        if self.envelope.is_none() {
            self.repack(registry)?;
        }
        Ok(self.envelope.as_deref().unwrap_or_default())
    }

    /// Recomputes the envelope unconditionally.
    pub fn repack(&mut self, registry: &SerializerRegistry) -> Result<&[u8]> {
        let payload = registry.get(&self.serializer)?.pack(&self.value)?;
        let bytes = self.header().encode(&payload)?;
        Ok(self.envelope.insert(bytes).as_slice())
    }

    /// Header fields as they would be written now.
    pub fn header(&self) -> EnvelopeHeader {
        EnvelopeHeader {
            version: FORMAT_VERSION,
            is_transformed: self.is_transformed,
            created_at: self.created_at,
            early_expires_at: self.early_expires_at,
            expires_at: self.expires_at,
            serializer: self.serializer,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now` (epoch seconds).
    ///
    /// An entry is expired once `now >= expires_at`; entries without an
    /// expiry never expire.
    pub fn is_expired(&self, now: u64) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    /// Checks if the entry has entered its soft-expiry window.
    pub fn is_early_expired(&self, now: u64) -> bool {
        match self.early_expires_at {
            Some(early) => now >= early,
            None => self.is_expired(now),
        }
    }

    // == Time To Live ==
    /// Returns remaining TTL in seconds, or None if no expiration is set.
    pub fn ttl_remaining(&self, now: u64) -> Option<u64> {
        self.expires_at.map(|expires| expires.saturating_sub(now))
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in seconds.
pub fn current_epoch_seconds() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or(0)
}

/// A zero header field reads back as "absent", so it cannot be stored.
fn check_not_zero(field: &str, value: Option<u64>) -> Result<()> {
    if value == Some(0) {
        return Err(CacheError::InvalidArgument(format!(
            "{} must be a positive epoch time",
            field
        )));
    }
    Ok(())
}
