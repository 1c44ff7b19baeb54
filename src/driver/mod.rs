//! Driver Module
//!
//! Turns raw byte storage into a cache with expiry, soft expiry and busy
//! locks.
//!
//! The busy lock is advisory. It pushes an expired entry's expiry a few
//! seconds out so fewer concurrent readers see it as expired, but it does not
//! exclude anyone: several callers may still regenerate the same key.

mod memory;
mod options;
pub mod recency;
mod store;

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{
    current_epoch_seconds, CacheEntry, CacheStats, CacheValue, EntryOptions, StatsCounters,
};
use crate::config::DriverConfig;
use crate::error::{CacheError, Result};
use crate::serializer::{SerializerId, SerializerRegistry};

pub use memory::MemoryStore;
pub use options::{early_expiry, ExpiryConfig, GetOptions, SetOptions};
pub use store::Store;

/// Reserved namespace for driver bookkeeping such as the recency index.
pub const INTERNAL_NAMESPACE: &str = "__envelope_cache__";

// == Driver ==
/// A cache over one namespace of a [`Store`].
pub struct Driver<S: Store + ?Sized> {
    store: Arc<S>,
    registry: Arc<SerializerRegistry>,
    namespace: String,
    serializer: SerializerId,
    expires_variance: f64,
    default_expires_in: Option<u64>,
    stats: StatsCounters,
}

impl<S: Store + ?Sized> Driver<S> {
    // == Constructor ==
    /// Creates a driver over `store`.
    ///
    /// # Errors
    /// - `InvalidArgument` for a missing serializer, a variance outside
    ///   [0, 1], or the reserved internal namespace
    /// - `UnknownSerializer` if the default serializer is not registered
    pub fn new(
        store: Arc<S>,
        registry: Arc<SerializerRegistry>,
        config: DriverConfig,
    ) -> Result<Self> {
        let serializer = config.validate()?;
        if config.namespace == INTERNAL_NAMESPACE {
            return Err(CacheError::InvalidArgument(format!(
                "namespace {:?} is reserved",
                INTERNAL_NAMESPACE
            )));
        }
        if !registry.contains(&serializer) {
            return Err(CacheError::UnknownSerializer(serializer.to_string()));
        }

        info!(
            "Driver created: store={}, namespace={}, serializer={}, expires_variance={}",
            store.name(),
            config.namespace,
            serializer,
            config.expires_variance
        );

        Ok(Self {
            store,
            registry,
            namespace: config.namespace,
            serializer,
            expires_variance: config.expires_variance,
            default_expires_in: config.default_expires_in,
            stats: StatsCounters::new(),
        })
    }

    // == Get ==
    /// Retrieves a live value.
    ///
    /// Returns `Ok(None)` when the key is missing or its entry is expired
    /// (by time or by `expire_if`). With a busy lock, an expired entry is
    /// first rewritten to expire `busy_lock` seconds from now; the result is
    /// still `Ok(None)` so this caller regenerates the value.
    ///
    /// Store failures and undecodable envelopes are errors, never misses.
    pub async fn get(&self, key: &str, options: &GetOptions) -> Result<Option<CacheValue>> {
        let Some(mut entry) = self.fetch_entry(key).await? else {
            self.stats.record_miss();
            self.stats.record_get_ok();
            debug!(namespace = %self.namespace, key, "cache miss");
            return Ok(None);
        };

        let now = current_epoch_seconds();
        if !options.is_expired(&entry, now) {
            self.stats.record_hit();
            self.stats.record_get_ok();
            self.record_use(key).await;
            debug!(namespace = %self.namespace, key, "cache hit");
            return Ok(Some(entry.into_value()));
        }

        self.stats.record_expired_miss();
        self.stats.record_get_ok();
        debug!(namespace = %self.namespace, key, "cache expired miss");

        if let Some(seconds) = options.busy_lock_seconds() {
            let lock_until = now.saturating_add(seconds);
            if let Err(err) = self.write_busy_lock(&mut entry, lock_until).await {
                self.stats.record_set_object_error();
                warn!(
                    namespace = %self.namespace,
                    key,
                    error = %err,
                    "busy lock write-back failed"
                );
            }
        }

        Ok(None)
    }

    /// Retrieves a live value and deserializes it into `T`.
    pub async fn get_as<T>(&self, key: &str, options: &GetOptions) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        self.get(key, options)
            .await?
            .map(|value| value.deserialize_into())
            .transpose()
    }

    /// Returns the stored entry as-is, without expiry checks or statistics.
    pub async fn get_entry(&self, key: &str) -> Result<Option<CacheEntry>> {
        let stored_key = self.stored_key(key)?;
        match self.store.fetch(&self.namespace, &stored_key).await? {
            Some(bytes) => CacheEntry::decode(key, &bytes, &self.registry).map(Some),
            None => Ok(None),
        }
    }

    // == Set ==
    /// Stores a value.
    ///
    /// `options` accepts a [`SetOptions`], an [`ExpiryConfig`] or a number of
    /// seconds.
    pub async fn set(
        &self,
        key: &str,
        value: impl Into<CacheValue>,
        options: impl Into<SetOptions>,
    ) -> Result<()> {
        let stored_key = self.stored_key(key)?;
        let now = current_epoch_seconds();
        let expiry = options
            .into()
            .resolve(now, self.expires_variance, self.default_expires_in);

        let mut entry = CacheEntry::new(
            key,
            value,
            EntryOptions {
                created_at: Some(now),
                expires_at: expiry.expires_at,
                early_expires_at: expiry.early_expires_at,
                serializer: Some(expiry.serializer.unwrap_or(self.serializer)),
                is_transformed: stored_key != key,
            },
        )?;

        self.set_object(&mut entry).await
    }

    /// Converts any serializable value and stores it.
    pub async fn set_serialize<T>(
        &self,
        key: &str,
        value: &T,
        options: impl Into<SetOptions>,
    ) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let value = CacheValue::from_serialize(value)?;
        self.set(key, value, options).await
    }

    // == Set Object ==
    /// Encodes an entry and writes it under its key.
    pub async fn set_object(&self, entry: &mut CacheEntry) -> Result<()> {
        let stored_key = self.stored_key(entry.key())?;
        let bytes = entry.pack(&self.registry)?.to_vec();

        match self.store.store(&self.namespace, &stored_key, bytes).await {
            Ok(()) => {
                self.stats.record_set_ok();
                self.record_use(entry.key()).await;
                debug!(
                    namespace = %self.namespace,
                    key = entry.key(),
                    expires_at = ?entry.expires_at(),
                    "cache set"
                );
                Ok(())
            }
            Err(err) => {
                self.stats.record_set_error();
                Err(err)
            }
        }
    }

    // == Remove ==
    /// Deletes a key and its recency index entry.
    ///
    /// Removing a key that is not stored succeeds.
    pub async fn remove(&self, key: &str) -> Result<()> {
        let stored_key = self.stored_key(key)?;
        self.store.remove(&self.namespace, &stored_key).await?;
        self.store.forget(&self.namespace, &stored_key).await?;
        debug!(namespace = %self.namespace, key, "cache remove");
        Ok(())
    }

    // == Enumeration ==
    /// Keys stored in this driver's namespace, as the store names them.
    pub async fn get_keys(&self) -> Result<Vec<String>> {
        self.store.get_keys(&self.namespace).await
    }

    /// User namespaces present in the underlying store.
    pub async fn get_namespaces(&self) -> Result<std::collections::BTreeSet<String>> {
        self.store.get_namespaces().await
    }

    // == Accessors ==
    /// Namespace every key of this driver lives in.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Default codec for new entries.
    pub fn serializer(&self) -> SerializerId {
        self.serializer
    }

    /// Fraction of the lifetime given to the soft-expiry window (`0.0..=1.0`).
    pub fn expires_variance(&self) -> f64 {
        self.expires_variance
    }

    /// Lifetime in seconds applied by `SetOptions::Default`.
    pub fn default_expires_in(&self) -> Option<u64> {
        self.default_expires_in
    }

    /// Codecs this driver packs and unpacks with.
    pub fn registry(&self) -> &SerializerRegistry {
        &self.registry
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Returns a snapshot of this driver's counters.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    // == Internals ==
    fn stored_key(&self, key: &str) -> Result<String> {
        if key.is_empty() {
            return Err(CacheError::InvalidArgument("a key is required".to_string()));
        }
        Ok(self.store.transform_key(key).into_owned())
    }

    /// Fetches and decodes; counts `get_errors` on failure.
    async fn fetch_entry(&self, key: &str) -> Result<Option<CacheEntry>> {
        let stored_key = self.stored_key(key)?;

        let bytes = match self.store.fetch(&self.namespace, &stored_key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Ok(None),
            Err(err) => {
                self.stats.record_get_error();
                return Err(err);
            }
        };

        match CacheEntry::decode(key, &bytes, &self.registry) {
            Ok(entry) => Ok(Some(entry)),
            Err(err) => {
                self.stats.record_get_error();
                warn!(namespace = %self.namespace, key, error = %err, "undecodable cache entry");
                Err(err)
            }
        }
    }

    async fn write_busy_lock(&self, entry: &mut CacheEntry, lock_until: u64) -> Result<()> {
        entry.set_expires_at(Some(lock_until))?;
        entry.set_early_expires_at(Some(lock_until))?;
        self.set_object(entry).await
    }

    async fn record_use(&self, key: &str) {
        let stored_key = self.store.transform_key(key);
        if let Err(err) = self.store.touch(&self.namespace, &stored_key).await {
            warn!(namespace = %self.namespace, key, error = %err, "recency update failed");
        }
    }
}

impl<S: Store + ?Sized> fmt::Debug for Driver<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("store", &self.store.name())
            .field("namespace", &self.namespace)
            .field("serializer", &self.serializer)
            .field("expires_variance", &self.expires_variance)
            .field("default_expires_in", &self.default_expires_in)
            .finish()
    }
}
