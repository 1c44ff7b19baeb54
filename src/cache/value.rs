//! Cache Value Module
//!
//! The typed payload carried by a cache entry.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

// == Cache Value ==
/// A value that can be stored in the cache.
///
/// The variant is preserved by every bundled serializer, so a `Timestamp`
/// comes back as a `Timestamp` and not as the string it serializes to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CacheValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    Bytes(Vec<u8>),
    /// Mapping, record or sequence handed to the serializer as-is
    Structured(serde_json::Value),
}

impl CacheValue {
    // == From Serialize ==
    /// Converts any serializable type into a cache value.
    ///
    /// Scalars map onto their dedicated variants, maps and sequences become
    /// `Structured`. A value serializing to `null` counts as absent.
    pub fn from_serialize<T>(value: &T) -> Result<Self>
    where
        T: Serialize + ?Sized,
    {
        let json = serde_json::to_value(value)
            .map_err(|e| CacheError::UnsupportedValueType(e.to_string()))?;

        match json {
            serde_json::Value::Null => Err(CacheError::InvalidArgument(
                "a value is required".to_string(),
            )),
            serde_json::Value::Bool(b) => Ok(CacheValue::Bool(b)),
            serde_json::Value::String(s) => Ok(CacheValue::Text(s)),
            serde_json::Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Ok(CacheValue::Integer(i)),
                (None, Some(f)) if n.is_f64() => Ok(CacheValue::Float(f)),
                // u64 above i64::MAX keeps its exact representation
                _ => Ok(CacheValue::Structured(serde_json::Value::Number(n))),
            },
            other => Ok(CacheValue::Structured(other)),
        }
    }

    // == Deserialize Into ==
    /// Deserializes the value into an application type.
    pub fn deserialize_into<T>(&self) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let json = match self {
            CacheValue::Text(s) => serde_json::Value::String(s.clone()),
            CacheValue::Integer(i) => serde_json::Value::from(*i),
            CacheValue::Float(f) => serde_json::Value::from(*f),
            CacheValue::Bool(b) => serde_json::Value::Bool(*b),
            CacheValue::Timestamp(ts) => serde_json::to_value(ts)?,
            CacheValue::Bytes(bytes) => serde_json::to_value(bytes)?,
            CacheValue::Structured(v) => v.clone(),
        };
        Ok(serde_json::from_value(json)?)
    }

    /// Returns the name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            CacheValue::Text(_) => "text",
            CacheValue::Integer(_) => "integer",
            CacheValue::Float(_) => "float",
            CacheValue::Bool(_) => "bool",
            CacheValue::Timestamp(_) => "timestamp",
            CacheValue::Bytes(_) => "bytes",
            CacheValue::Structured(_) => "structured",
        }
    }

    /// A structured `null` stands for "no value".
    pub fn is_absent(&self) -> bool {
        matches!(self, CacheValue::Structured(serde_json::Value::Null))
    }

    /// Checks that every bundled serializer can represent the value.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.is_absent() {
            return Err(CacheError::InvalidArgument(
                "a value is required".to_string(),
            ));
        }
        if let CacheValue::Float(f) = self {
            if !f.is_finite() {
                return Err(CacheError::UnsupportedValueType(format!(
                    "non-finite float {}",
                    f
                )));
            }
        }
        Ok(())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CacheValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            CacheValue::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

// == Conversions ==
impl From<String> for CacheValue {
    fn from(value: String) -> Self {
        CacheValue::Text(value)
    }
}

impl From<&str> for CacheValue {
    fn from(value: &str) -> Self {
        CacheValue::Text(value.to_string())
    }
}

impl From<i64> for CacheValue {
    fn from(value: i64) -> Self {
        CacheValue::Integer(value)
    }
}

impl From<i32> for CacheValue {
    fn from(value: i32) -> Self {
        CacheValue::Integer(value.into())
    }
}

impl From<u32> for CacheValue {
    fn from(value: u32) -> Self {
        CacheValue::Integer(value.into())
    }
}

impl From<f64> for CacheValue {
    fn from(value: f64) -> Self {
        CacheValue::Float(value)
    }
}

impl From<bool> for CacheValue {
    fn from(value: bool) -> Self {
        CacheValue::Bool(value)
    }
}

impl From<DateTime<Utc>> for CacheValue {
    fn from(value: DateTime<Utc>) -> Self {
        CacheValue::Timestamp(value)
    }
}

impl From<Vec<u8>> for CacheValue {
    fn from(value: Vec<u8>) -> Self {
        CacheValue::Bytes(value)
    }
}

impl From<&[u8]> for CacheValue {
    fn from(value: &[u8]) -> Self {
        CacheValue::Bytes(value.to_vec())
    }
}

impl From<serde_json::Value> for CacheValue {
    fn from(value: serde_json::Value) -> Self {
        CacheValue::Structured(value)
    }
}
