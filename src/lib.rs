//! Envelope Cache - a storage-agnostic cache core
//!
//! Encodes values into versioned byte envelopes and layers expiry, soft
//! expiry and busy locks over any [`Store`](driver::Store).

pub mod cache;
pub mod config;
pub mod driver;
pub mod error;
pub mod serializer;

pub use cache::{CacheEntry, CacheStats, CacheValue, EntryOptions};
pub use config::DriverConfig;
pub use driver::{Driver, ExpiryConfig, GetOptions, MemoryStore, SetOptions, Store};
pub use error::{CacheError, Result};
pub use serializer::{Serializer, SerializerId, SerializerRegistry};
