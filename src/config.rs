//! Deserializable fetcher configuration.

use crate::{FetcherBuilder, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Error threshold used when none is configured.
pub const DEFAULT_ERROR_THRESHOLD: u16 = 400;

/// Plain-data configuration for a [`Fetcher`](crate::Fetcher).
///
/// Every field has a default, so an empty document is a valid
/// configuration.
///
/// # Examples
///
/// ```
/// use fetcher::FetcherConfig;
///
/// let config: FetcherConfig = serde_json::from_str(r#"{
///     "base_url": "https://api.example.com",
///     "default_headers": { "User-Agent": "my-app/1.0" },
///     "error_threshold": 500
/// }"#).unwrap();
///
/// assert_eq!(config.error_threshold, 500);
/// assert_eq!(config.timeout_ms, None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Prefix for relative paths. Empty means every path must be absolute.
    pub base_url: String,

    /// Headers sent with every request unless overridden per call.
    pub default_headers: BTreeMap<String, String>,

    /// Responses with a status at or above this are logged at error level.
    pub error_threshold: u16,

    /// Transport timeout applied to every request, in milliseconds.
    pub timeout_ms: Option<u64>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            default_headers: BTreeMap::new(),
            error_threshold: DEFAULT_ERROR_THRESHOLD,
            timeout_ms: None,
        }
    }
}

impl FetcherConfig {
    /// Converts the configuration into a builder.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL or a header is invalid.
    pub fn into_builder(self) -> Result<FetcherBuilder> {
        FetcherBuilder::from_config(self)
    }

    pub(crate) fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}
