//! Configuration Module
//!
//! Handles loading and validating driver configuration.

use std::env;

use crate::error::{CacheError, Result};
use crate::serializer::SerializerId;

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Driver configuration parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverConfig {
    /// Key-space partition for this driver
    pub namespace: String,
    /// Default serializer id; required
    pub serializer: Option<String>,
    /// Width of the soft-expiry window, in [0, 1]
    pub expires_variance: f64,
    /// Expiry in seconds for sets without explicit options, None = never
    pub default_expires_in: Option<u64>,
}

impl DriverConfig {
    /// Creates a config with the given default serializer.
    pub fn new(serializer: impl Into<String>) -> Self {
        Self {
            serializer: Some(serializer.into()),
            ..Self::default()
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_expires_variance(mut self, variance: f64) -> Self {
        self.expires_variance = variance;
        self
    }

    pub fn with_default_expires_in(mut self, seconds: u64) -> Self {
        self.default_expires_in = Some(seconds);
        self
    }

    /// Creates a new DriverConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_NAMESPACE` - Namespace (default: "default")
    /// - `CACHE_SERIALIZER` - Default serializer id (no default)
    /// - `CACHE_EXPIRES_VARIANCE` - Soft-expiry variance (default: 0)
    /// - `CACHE_DEFAULT_EXPIRES_IN` - Default expiry in seconds (default: never)
    pub fn from_env() -> Self {
        Self {
            namespace: env::var("CACHE_NAMESPACE")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            serializer: env::var("CACHE_SERIALIZER").ok().filter(|v| !v.is_empty()),
            expires_variance: env::var("CACHE_EXPIRES_VARIANCE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.0),
            default_expires_in: env::var("CACHE_DEFAULT_EXPIRES_IN")
                .ok()
                .and_then(|v| v.parse().ok()),
        }
    }

    // == Validate ==
    /// Checks the config and returns the parsed default serializer id.
    pub fn validate(&self) -> Result<SerializerId> {
        if self.namespace.is_empty() {
            return Err(CacheError::InvalidArgument(
                "namespace must not be empty".to_string(),
            ));
        }

        if !self.expires_variance.is_finite() || !(0.0..=1.0).contains(&self.expires_variance) {
            return Err(CacheError::InvalidArgument(format!(
                "expires_variance must be within [0, 1], got {}",
                self.expires_variance
            )));
        }

        let serializer = self
            .serializer
            .as_deref()
            .ok_or_else(|| CacheError::InvalidArgument("provide a serializer".to_string()))?;
        SerializerId::new(serializer)
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            serializer: None,
            expires_variance: 0.0,
            default_expires_in: None,
        }
    }
}
