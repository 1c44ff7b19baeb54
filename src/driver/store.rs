//! Store Trait
//!
//! The raw byte storage a driver delegates to.

use std::borrow::Cow;
use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::error::{CacheError, Result};

/// Backend storage for envelope bytes, keyed within a namespace.
///
/// Only `fetch`, `store` and `remove` are mandatory. Enumeration defaults to
/// `NotImplemented`; the key transform and recency hooks default to identity
/// and no-op.
///
/// Implementations report their own failures as [`CacheError::Store`].
#[async_trait]
pub trait Store: Send + Sync {
    /// Short backend name used in logs and errors.
    fn name(&self) -> &str;

    /// Returns the bytes stored under `key`, or `None`.
    async fn fetch(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>>;

    /// Stores `bytes` under `key`, replacing any previous value.
    async fn store(&self, namespace: &str, key: &str, bytes: Vec<u8>) -> Result<()>;

    /// Deletes `key`.
    async fn remove(&self, namespace: &str, key: &str) -> Result<()>;

    /// Lists the keys of a namespace.
    async fn get_keys(&self, _namespace: &str) -> Result<Vec<String>> {
        Err(CacheError::NotImplemented {
            driver: self.name().to_string(),
            method: "getKeys",
        })
    }

    /// Lists the user namespaces present in the store.
    async fn get_namespaces(&self) -> Result<BTreeSet<String>> {
        Err(CacheError::NotImplemented {
            driver: self.name().to_string(),
            method: "getNamespaces",
        })
    }

    /// Maps a caller key to the key actually stored.
    fn transform_key<'a>(&self, key: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(key)
    }

    /// Records that `key` was just written or read.
    async fn touch(&self, _namespace: &str, _key: &str) -> Result<()> {
        Ok(())
    }

    /// Drops any bookkeeping held for `key`.
    async fn forget(&self, _namespace: &str, _key: &str) -> Result<()> {
        Ok(())
    }
}
