//! Integration Tests for the Driver
//!
//! Exercises get/set/remove against the memory store and against stores
//! that fail or rewrite keys.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use envelope_cache::cache::{current_epoch_seconds, EnvelopeHeader};
use envelope_cache::{
    CacheError, CacheValue, Driver, DriverConfig, ExpiryConfig, GetOptions, MemoryStore, Result,
    SerializerId, SerializerRegistry, SetOptions, Store,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

// == Helper Functions ==

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "envelope_cache=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

fn registry() -> Arc<SerializerRegistry> {
    Arc::new(SerializerRegistry::with_defaults())
}

fn create_driver(store: Arc<MemoryStore>, config: DriverConfig) -> Driver<MemoryStore> {
    init_tracing();
    Driver::new(store, registry(), config).unwrap()
}

fn create_test_driver() -> Driver<MemoryStore> {
    create_driver(Arc::new(MemoryStore::new()), DriverConfig::new("json"))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
    username: String,
    password: String,
    inserted: String,
}

fn sample_user() -> User {
    User {
        username: "chilts".to_string(),
        password: "sekrit".to_string(),
        inserted: "2012-07-12T17:36:24.000Z".to_string(),
    }
}

/// Fails every operation.
struct BrokenStore;

#[async_trait]
impl Store for BrokenStore {
    fn name(&self) -> &str {
        "broken"
    }

    async fn fetch(&self, _namespace: &str, _key: &str) -> Result<Option<Vec<u8>>> {
        Err(CacheError::store(anyhow::anyhow!("fetch refused")))
    }

    async fn store(&self, _namespace: &str, _key: &str, _bytes: Vec<u8>) -> Result<()> {
        Err(CacheError::store(anyhow::anyhow!("store refused")))
    }

    async fn remove(&self, _namespace: &str, _key: &str) -> Result<()> {
        Err(CacheError::store(anyhow::anyhow!("remove refused")))
    }
}

/// Memory store whose writes can be switched off.
#[derive(Default)]
struct ReadOnlyStore {
    inner: MemoryStore,
    read_only: AtomicBool,
}

#[async_trait]
impl Store for ReadOnlyStore {
    fn name(&self) -> &str {
        "read-only"
    }

    async fn fetch(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>> {
        self.inner.fetch(namespace, key).await
    }

    async fn store(&self, namespace: &str, key: &str, bytes: Vec<u8>) -> Result<()> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(CacheError::store(anyhow::anyhow!("store is read-only")));
        }
        self.inner.store(namespace, key, bytes).await
    }

    async fn remove(&self, namespace: &str, key: &str) -> Result<()> {
        self.inner.remove(namespace, key).await
    }
}

/// Memory store that prefixes every key.
#[derive(Default)]
struct PrefixStore {
    inner: MemoryStore,
}

#[async_trait]
impl Store for PrefixStore {
    fn name(&self) -> &str {
        "prefix"
    }

    async fn fetch(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>> {
        self.inner.fetch(namespace, key).await
    }

    async fn store(&self, namespace: &str, key: &str, bytes: Vec<u8>) -> Result<()> {
        self.inner.store(namespace, key, bytes).await
    }

    async fn remove(&self, namespace: &str, key: &str) -> Result<()> {
        self.inner.remove(namespace, key).await
    }

    async fn get_keys(&self, namespace: &str) -> Result<Vec<String>> {
        self.inner.get_keys(namespace).await
    }

    async fn get_namespaces(&self) -> Result<BTreeSet<String>> {
        self.inner.get_namespaces().await
    }

    fn transform_key<'a>(&self, key: &'a str) -> Cow<'a, str> {
        Cow::Owned(format!("app:{}", key))
    }
}

// == Miss / Hit ==

#[tokio::test]
async fn test_get_empty_key() {
    let driver = create_test_driver();

    let user = driver.get("user:unknown", &GetOptions::new()).await.unwrap();
    assert!(user.is_none());
    assert_eq!(driver.stats().misses, 1);
}

#[tokio::test]
async fn test_set_and_get_structured() {
    let driver = create_test_driver();

    driver
        .set_serialize("user:chilts", &sample_user(), SetOptions::Never)
        .await
        .unwrap();
    let user: Option<User> = driver.get_as("user:chilts", &GetOptions::new()).await.unwrap();

    assert_eq!(user, Some(sample_user()));
    let stats = driver.stats();
    assert_eq!(stats.set_oks, 1);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 0);
}

#[tokio::test]
async fn test_every_value_kind_through_msgpack() {
    let driver = create_driver(Arc::new(MemoryStore::new()), DriverConfig::new("msgp"));
    let values = vec![
        CacheValue::from("text"),
        CacheValue::from(-42i64),
        CacheValue::from(2.75),
        CacheValue::from(true),
        CacheValue::from(Utc.timestamp_opt(1_342_115_784, 0).unwrap()),
        CacheValue::from(vec![0u8, 1, 2, 255]),
        CacheValue::from(json!({"nested": {"list": [1, "two", null]}})),
    ];

    for (i, value) in values.iter().enumerate() {
        let key = format!("kind:{}", i);
        driver.set(&key, value.clone(), SetOptions::Never).await.unwrap();
        let back = driver.get(&key, &GetOptions::new()).await.unwrap();
        assert_eq!(back.as_ref(), Some(value), "{} did not round-trip", value.kind());
    }

    let entry = driver.get_entry("kind:0").await.unwrap().unwrap();
    assert_eq!(entry.serializer(), SerializerId::MSGPACK);
}

#[tokio::test]
async fn test_per_entry_serializer_override() {
    let driver = create_test_driver();
    let options = ExpiryConfig::new().serializer(SerializerId::MSGPACK);

    driver.set("k", "v", options).await.unwrap();

    let entry = driver.get_entry("k").await.unwrap().unwrap();
    assert_eq!(entry.serializer(), SerializerId::MSGPACK);
    assert_eq!(
        driver.get("k", &GetOptions::new()).await.unwrap(),
        Some(CacheValue::from("v"))
    );
}

// == Expiry ==

#[tokio::test]
async fn test_expired_without_busy_lock() {
    let driver = create_test_driver();
    driver.set("k", "v", SetOptions::Now).await.unwrap();

    let value = driver.get("k", &GetOptions::new()).await.unwrap();
    assert!(value.is_none());

    let stats = driver.stats();
    assert_eq!(stats.expired_misses, 1);
    assert_eq!(stats.hits, 0);
    assert_eq!(stats.misses, 0);
}

#[tokio::test]
async fn test_expired_with_busy_lock() {
    let store = Arc::new(MemoryStore::new());
    let driver = create_driver(store.clone(), DriverConfig::new("json"));
    driver.set("k", "v", SetOptions::Now).await.unwrap();

    let before = current_epoch_seconds();
    let value = driver.get("k", &GetOptions::new().busy_lock(10)).await.unwrap();
    let after = current_epoch_seconds();
    assert!(value.is_none());

    let bytes = store.fetch("default", "k").await.unwrap().unwrap();
    let (header, _) = EnvelopeHeader::decode(&bytes).unwrap();
    let expires_at = header.expires_at.unwrap();
    assert!(expires_at >= before + 10 && expires_at <= after + 10);
    assert_eq!(header.early_expires_at, Some(expires_at));

    // the lock makes the entry live again for other readers
    let value = driver.get("k", &GetOptions::new()).await.unwrap();
    assert_eq!(value, Some(CacheValue::from("v")));
    assert_eq!(driver.stats().expired_misses, 1);
}

#[tokio::test]
async fn test_busy_lock_write_failure_still_misses() {
    init_tracing();
    let store = Arc::new(ReadOnlyStore::default());
    let driver = Driver::new(store.clone(), registry(), DriverConfig::new("json")).unwrap();
    driver.set("k", "v", SetOptions::Now).await.unwrap();

    store.read_only.store(true, Ordering::SeqCst);
    let value = driver.get("k", &GetOptions::new().busy_lock(10)).await.unwrap();
    assert!(value.is_none());

    let stats = driver.stats();
    assert_eq!(stats.expired_misses, 1);
    assert_eq!(stats.set_object_errors, 1);
    assert_eq!(stats.set_errors, 1);
    assert_eq!(stats.get_errors, 0);
}

#[tokio::test]
async fn test_expire_if_predicate() {
    let driver = create_test_driver();
    driver.set("k", "v", SetOptions::Never).await.unwrap();

    let options = GetOptions::new().expire_if(|entry| entry.value().as_str() == Some("v"));
    assert!(driver.get("k", &options).await.unwrap().is_none());

    let options = GetOptions::new().expire_if(|_| false);
    assert!(driver.get("k", &options).await.unwrap().is_some());

    let stats = driver.stats();
    assert_eq!(stats.expired_misses, 1);
    assert_eq!(stats.hits, 1);
}

#[tokio::test]
async fn test_soft_window_via_expire_if() {
    let driver = create_driver(
        Arc::new(MemoryStore::new()),
        DriverConfig::new("json").with_expires_variance(1.0),
    );
    driver.set("k", "v", SetOptions::ExpiresIn(3600)).await.unwrap();

    // live by hard expiry, but already inside the soft window
    assert!(driver.get("k", &GetOptions::new()).await.unwrap().is_some());
    let early = GetOptions::new().expire_if(|entry| entry.is_early_expired(current_epoch_seconds()));
    assert!(driver.get("k", &early).await.unwrap().is_none());
}

#[tokio::test]
async fn test_set_with_dynamic_options() {
    let driver = create_driver(
        Arc::new(MemoryStore::new()),
        DriverConfig::new("json").with_expires_variance(0.5),
    );

    let options = SetOptions::try_from(&json!({"expiresIn": 100})).unwrap();
    driver.set("k", "v", options).await.unwrap();
    let entry = driver.get_entry("k").await.unwrap().unwrap();
    assert_eq!(entry.early_expires_at(), Some(entry.created_at() + 50));

    let bad = SetOptions::try_from(&json!(["never"]));
    assert!(matches!(bad, Err(CacheError::InvalidOptions(_))));
}

// == Errors ==

#[tokio::test]
async fn test_undecodable_entry_is_error_not_miss() {
    let store = Arc::new(MemoryStore::new());
    let driver = create_driver(store.clone(), DriverConfig::new("json"));
    store.store("default", "garbage", b"short".to_vec()).await.unwrap();

    let result = driver.get("garbage", &GetOptions::new()).await;
    assert!(matches!(result, Err(CacheError::CorruptEnvelope(_))));

    let stats = driver.stats();
    assert_eq!(stats.get_errors, 1);
    assert_eq!(stats.misses, 0);
}

#[tokio::test]
async fn test_store_errors_pass_through() {
    init_tracing();
    let driver = Driver::new(Arc::new(BrokenStore), registry(), DriverConfig::new("json")).unwrap();

    let err = driver.get("k", &GetOptions::new()).await.unwrap_err();
    assert!(err.is_store_error());
    assert_eq!(err.to_string(), "Store error: fetch refused");

    let err = driver.set("k", "v", SetOptions::Never).await.unwrap_err();
    assert_eq!(err.to_string(), "Store error: store refused");

    assert!(driver.remove("k").await.unwrap_err().is_store_error());

    let stats = driver.stats();
    assert_eq!(stats.get_errors, 1);
    assert_eq!(stats.set_errors, 1);
    assert_eq!(stats.get_oks + stats.set_oks, 0);
}

#[tokio::test]
async fn test_enumeration_not_implemented_by_default() {
    init_tracing();
    let driver = Driver::new(Arc::new(BrokenStore), registry(), DriverConfig::new("json")).unwrap();

    assert!(matches!(
        driver.get_keys().await,
        Err(CacheError::NotImplemented { method: "getKeys", .. })
    ));
    assert!(matches!(
        driver.get_namespaces().await,
        Err(CacheError::NotImplemented { method: "getNamespaces", .. })
    ));
}

#[tokio::test]
async fn test_invalid_set_values() {
    let driver = create_test_driver();

    let result = driver.set("k", serde_json::Value::Null, SetOptions::Never).await;
    assert!(matches!(result, Err(CacheError::InvalidArgument(_))));

    let result = driver.set("k", f64::INFINITY, SetOptions::Never).await;
    assert!(matches!(result, Err(CacheError::UnsupportedValueType(_))));

    let options = ExpiryConfig::new().expires_at(2_000_000_000).early_expires_at(2_000_000_100);
    let result = driver.set("k", "v", options).await;
    assert!(matches!(result, Err(CacheError::InvalidArgument(_))));

    assert_eq!(driver.stats().set_oks, 0);
}

#[tokio::test]
async fn test_zero_expiry_rejected() {
    let driver = create_test_driver();

    let result = driver.set("k", "v", ExpiryConfig::new().expires_at(0)).await;
    assert!(matches!(result, Err(CacheError::InvalidArgument(_))));

    let options = ExpiryConfig::new().expires_at(2_000_000_000).early_expires_at(0);
    let result = driver.set("k", "v", options).await;
    assert!(matches!(result, Err(CacheError::InvalidArgument(_))));

    // nothing was written that could read back as never-expiring
    assert_eq!(driver.get("k", &GetOptions::new()).await.unwrap(), None);
    assert_eq!(driver.stats().set_oks, 0);
}

// == Isolation ==

#[tokio::test]
async fn test_counter_isolation() {
    let store = Arc::new(MemoryStore::new());
    let first = create_driver(store.clone(), DriverConfig::new("json"));
    let second = create_driver(store.clone(), DriverConfig::new("json"));

    first.set("shared", "v", SetOptions::Never).await.unwrap();
    let value = second.get("shared", &GetOptions::new()).await.unwrap();
    assert_eq!(value, Some(CacheValue::from("v")));

    assert_eq!(first.stats().set_oks, 1);
    assert_eq!(first.stats().hits, 0);
    assert_eq!(second.stats().set_oks, 0);
    assert_eq!(second.stats().hits, 1);
}

#[tokio::test]
async fn test_independent_stores() {
    let first = create_test_driver();
    let second = create_test_driver();

    first.set("k", "v", SetOptions::Never).await.unwrap();
    assert!(second.get("k", &GetOptions::new()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_namespaces_partition_keys() {
    let store = Arc::new(MemoryStore::new());
    let users = create_driver(store.clone(), DriverConfig::new("json").with_namespace("users"));
    let sessions = create_driver(store.clone(), DriverConfig::new("json").with_namespace("sessions"));

    users.set("id", "user", SetOptions::Never).await.unwrap();
    sessions.set("id", "session", SetOptions::Never).await.unwrap();

    assert_eq!(
        users.get("id", &GetOptions::new()).await.unwrap(),
        Some(CacheValue::from("user"))
    );
    assert_eq!(users.get_keys().await.unwrap(), vec!["id"]);

    let namespaces: Vec<String> = users.get_namespaces().await.unwrap().into_iter().collect();
    assert_eq!(namespaces, vec!["sessions", "users"]);
}

// == Key Transform ==

#[tokio::test]
async fn test_key_transform() {
    init_tracing();
    let store = Arc::new(PrefixStore::default());
    let driver = Driver::new(store.clone(), registry(), DriverConfig::new("json")).unwrap();

    driver.set("k", "v", SetOptions::Never).await.unwrap();
    assert_eq!(driver.get_keys().await.unwrap(), vec!["app:k"]);

    let entry = driver.get_entry("k").await.unwrap().unwrap();
    assert!(entry.is_transformed());
    assert_eq!(
        driver.get("k", &GetOptions::new()).await.unwrap(),
        Some(CacheValue::from("v"))
    );

    driver.remove("k").await.unwrap();
    assert!(store.inner.is_empty("default").await);
}

// == Recency Index ==

#[tokio::test]
async fn test_discard_policy_follows_use() {
    let store = Arc::new(MemoryStore::new());
    let driver = create_driver(store.clone(), DriverConfig::new("json"));

    for key in ["a", "b", "c"] {
        driver.set(key, key, SetOptions::Never).await.unwrap();
    }
    driver.get("a", &GetOptions::new()).await.unwrap();

    assert_eq!(store.discard_policy_lru("default").await, vec!["b", "c", "a"]);

    driver.remove("c").await.unwrap();
    assert_eq!(store.discard_policy_lru("default").await, vec!["b", "a"]);
    assert_eq!(driver.get_keys().await.unwrap(), vec!["a", "b"]);
}
