//! Get and Set options.

use std::fmt;
use std::str::FromStr;

use crate::cache::CacheEntry;
use crate::error::{CacheError, Result};
use crate::serializer::SerializerId;

// == Set Options ==
/// Expiry policy for a set.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SetOptions {
    /// The driver's default expiry
    #[default]
    Default,
    /// No expiry
    Never,
    /// Expired as soon as written
    Now,
    /// Expires this many seconds from now
    ExpiresIn(u64),
    /// Explicit expiry fields
    Config(ExpiryConfig),
}

/// Explicit expiry fields for [`SetOptions::Config`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpiryConfig {
    /// Absolute expiry, epoch seconds
    pub expires_at: Option<u64>,
    /// Relative expiry in seconds; wins over `expires_at`
    pub expires_in: Option<u64>,
    /// Start of the soft window; derived from the variance when absent
    pub early_expires_at: Option<u64>,
    /// Codec override for this entry
    pub serializer: Option<SerializerId>,
}

impl ExpiryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expires_at(mut self, epoch: u64) -> Self {
        self.expires_at = Some(epoch);
        self
    }

    pub fn expires_in(mut self, seconds: u64) -> Self {
        self.expires_in = Some(seconds);
        self
    }

    pub fn early_expires_at(mut self, epoch: u64) -> Self {
        self.early_expires_at = Some(epoch);
        self
    }

    pub fn serializer(mut self, serializer: SerializerId) -> Self {
        self.serializer = Some(serializer);
        self
    }
}

impl From<ExpiryConfig> for SetOptions {
    fn from(config: ExpiryConfig) -> Self {
        SetOptions::Config(config)
    }
}

impl From<u64> for SetOptions {
    fn from(seconds: u64) -> Self {
        SetOptions::ExpiresIn(seconds)
    }
}

/// Expiry fields after resolving options against the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ResolvedExpiry {
    pub expires_at: Option<u64>,
    pub early_expires_at: Option<u64>,
    pub serializer: Option<SerializerId>,
}

impl SetOptions {
    // == Resolve ==
    /// Turns the options into absolute timestamps at `now`.
    pub(crate) fn resolve(
        &self,
        now: u64,
        variance: f64,
        default_expires_in: Option<u64>,
    ) -> ResolvedExpiry {
        let config = match self {
            SetOptions::Default => ExpiryConfig {
                expires_in: default_expires_in,
                ..ExpiryConfig::default()
            },
            SetOptions::Never => ExpiryConfig::default(),
            SetOptions::Now => ExpiryConfig::new().expires_in(0),
            SetOptions::ExpiresIn(seconds) => ExpiryConfig::new().expires_in(*seconds),
            SetOptions::Config(config) => config.clone(),
        };

        let expires_at = match config.expires_in {
            Some(seconds) => Some(now.saturating_add(seconds)),
            None => config.expires_at,
        };
        let early_expires_at = config
            .early_expires_at
            .or_else(|| expires_at.map(|expires| early_expiry(now, expires, variance)));

        ResolvedExpiry {
            expires_at,
            early_expires_at,
            serializer: config.serializer,
        }
    }
}

/// Start of the soft window: `expires - (expires - now) * variance`.
///
/// A variance of 0 gives no window, a variance of 1 starts it at `now`.
pub fn early_expiry(now: u64, expires_at: u64, variance: f64) -> u64 {
    let span = expires_at.saturating_sub(now);
    let shift = (span as f64 * variance.clamp(0.0, 1.0)).floor() as u64;
    expires_at - shift.min(span)
}

// == Dynamic Parsing ==
impl TryFrom<&serde_json::Value> for SetOptions {
    type Error = CacheError;

    /// Accepts `"never"`, `"now"`, a whole number of seconds, or an object of
    /// recognized expiry fields. `null` selects the driver default.
    fn try_from(value: &serde_json::Value) -> Result<Self> {
        use serde_json::Value;

        match value {
            Value::Null => Ok(SetOptions::Default),
            Value::String(s) => s.parse(),
            Value::Number(_) => Ok(SetOptions::ExpiresIn(seconds_field("expiresIn", value)?)),
            Value::Object(fields) => {
                let mut config = ExpiryConfig::default();
                for (name, field) in fields {
                    match name.as_str() {
                        "expiresAt" | "expires_at" => {
                            config.expires_at = Some(seconds_field(name, field)?)
                        }
                        "expiresIn" | "expires_in" => {
                            config.expires_in = Some(seconds_field(name, field)?)
                        }
                        "earlyExpiresAt" | "early_expires_at" => {
                            config.early_expires_at = Some(seconds_field(name, field)?)
                        }
                        "serializer" => {
                            let id = field
                                .as_str()
                                .and_then(|s| SerializerId::new(s).ok())
                                .ok_or_else(|| {
                                    CacheError::InvalidOptions(format!(
                                        "serializer must be a 4-character id, got {}",
                                        field
                                    ))
                                })?;
                            config.serializer = Some(id);
                        }
                        other => {
                            return Err(CacheError::InvalidOptions(format!(
                                "unrecognized option {:?}",
                                other
                            )))
                        }
                    }
                }
                Ok(SetOptions::Config(config))
            }
            other => Err(CacheError::InvalidOptions(format!(
                "unknown format for options: {}",
                other
            ))),
        }
    }
}

impl FromStr for SetOptions {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "never" => Ok(SetOptions::Never),
            "now" => Ok(SetOptions::Now),
            other => other.parse::<u64>().map(SetOptions::ExpiresIn).map_err(|_| {
                CacheError::InvalidOptions(format!("unknown format for options: {:?}", other))
            }),
        }
    }
}

fn seconds_field(name: &str, value: &serde_json::Value) -> Result<u64> {
    value.as_u64().ok_or_else(|| {
        CacheError::InvalidOptions(format!(
            "{} must be a non-negative whole number, got {}",
            name, value
        ))
    })
}

// == Get Options ==
type ExpirePredicate = Box<dyn Fn(&CacheEntry) -> bool + Send + Sync>;

/// Options for a get.
#[derive(Default)]
pub struct GetOptions {
    expire_if: Option<ExpirePredicate>,
    busy_lock: Option<u64>,
}

impl GetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treats the entry as expired whenever `predicate` returns true.
    pub fn expire_if<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CacheEntry) -> bool + Send + Sync + 'static,
    {
        self.expire_if = Some(Box::new(predicate));
        self
    }

    /// On an expired entry, pushes its expiry `seconds` into the future
    /// before reporting the miss.
    pub fn busy_lock(mut self, seconds: u64) -> Self {
        self.busy_lock = Some(seconds);
        self
    }

    pub fn busy_lock_seconds(&self) -> Option<u64> {
        self.busy_lock
    }

    pub(crate) fn is_expired(&self, entry: &CacheEntry, now: u64) -> bool {
        entry.is_expired(now) || self.expire_if.as_ref().is_some_and(|predicate| predicate(entry))
    }
}

impl fmt::Debug for GetOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GetOptions")
            .field("expire_if", &self.expire_if.as_ref().map(|_| "<predicate>"))
            .field("busy_lock", &self.busy_lock)
            .finish()
    }
}
