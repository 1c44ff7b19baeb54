//! Memory Store Module
//!
//! In-process backend keeping envelopes in a namespaced HashMap.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::driver::recency;
use crate::driver::{Store, INTERNAL_NAMESPACE};
use crate::error::Result;

type Namespaces = HashMap<String, HashMap<String, Vec<u8>>>;

// == Memory Store ==
/// Envelope storage in process memory.
///
/// Each `MemoryStore` owns its data; share one between drivers by wrapping
/// it in an `Arc`. Recency bookkeeping lives under [`INTERNAL_NAMESPACE`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    namespaces: RwLock<Namespaces>,
    /// Logical clock for use stamps
    use_clock: AtomicU64,
}

impl MemoryStore {
    // == Constructor ==
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // == Discard Policy ==
    /// Keys of `namespace` in least-recently-used order, oldest first.
    ///
    /// Candidates only; the store never evicts on its own.
    pub async fn discard_policy_lru(&self, namespace: &str) -> Vec<String> {
        let guard = self.namespaces.read().await;
        match guard.get(INTERNAL_NAMESPACE) {
            Some(index) => recency::lru_order(
                namespace,
                index.iter().map(|(k, v)| (k.as_str(), v.as_slice())),
            ),
            None => Vec::new(),
        }
    }

    /// Number of keys stored in `namespace`.
    pub async fn len(&self, namespace: &str) -> usize {
        self.namespaces
            .read()
            .await
            .get(namespace)
            .map_or(0, HashMap::len)
    }

    pub async fn is_empty(&self, namespace: &str) -> bool {
        self.len(namespace).await == 0
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn fetch(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>> {
        let guard = self.namespaces.read().await;
        Ok(guard.get(namespace).and_then(|keys| keys.get(key)).cloned())
    }

    async fn store(&self, namespace: &str, key: &str, bytes: Vec<u8>) -> Result<()> {
        let mut guard = self.namespaces.write().await;
        guard
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), bytes);
        debug!(namespace, key, "memory store: stored");
        Ok(())
    }

    async fn remove(&self, namespace: &str, key: &str) -> Result<()> {
        let mut guard = self.namespaces.write().await;
        if let Some(keys) = guard.get_mut(namespace) {
            keys.remove(key);
        }
        Ok(())
    }

    async fn get_keys(&self, namespace: &str) -> Result<Vec<String>> {
        let guard = self.namespaces.read().await;
        let mut keys: Vec<String> = guard
            .get(namespace)
            .map(|keys| keys.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        Ok(keys)
    }

    async fn get_namespaces(&self) -> Result<BTreeSet<String>> {
        let guard = self.namespaces.read().await;
        Ok(guard
            .keys()
            .filter(|ns| ns.as_str() != INTERNAL_NAMESPACE)
            .cloned()
            .collect())
    }

    async fn touch(&self, namespace: &str, key: &str) -> Result<()> {
        let mut guard = self.namespaces.write().await;
        // stamp under the lock so insertion order follows stamp order
        let stamp = self.use_clock.fetch_add(1, Ordering::Relaxed) + 1;
        guard
            .entry(INTERNAL_NAMESPACE.to_string())
            .or_default()
            .insert(recency::index_key(namespace, key), recency::encode_stamp(stamp));
        Ok(())
    }

    async fn forget(&self, namespace: &str, key: &str) -> Result<()> {
        let mut guard = self.namespaces.write().await;
        if let Some(index) = guard.get_mut(INTERNAL_NAMESPACE) {
            index.remove(&recency::index_key(namespace, key));
        }
        Ok(())
    }
}
