//! Cache Module
//!
//! Entries, their values, the envelope codec and statistics.

mod entry;
pub mod envelope;
mod stats;
mod value;


// Re-export public types
pub use entry::{current_epoch_seconds, CacheEntry, EntryOptions};
pub use envelope::EnvelopeHeader;
pub use stats::{CacheStats, StatsCounters};
pub use value::CacheValue;
