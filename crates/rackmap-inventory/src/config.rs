//! Inventory configuration
//!
//! All recognized options for one assembler run, deserialized from a TOML
//! file. Every option except the endpoint and token has a default.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{InventoryError, Result};
use crate::filter::Predicate;

/// Configuration for a single inventory build
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryConfig {
    /// Base URL of the catalog API (trailing slashes are trimmed)
    pub api_endpoint: String,
    /// Bearer credential
    pub token: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Verify TLS certificates
    #[serde(default = "default_true")]
    pub validate_certs: bool,
    /// Request nested config context data on host records
    #[serde(default)]
    pub config_context: bool,
    /// Expand config context into sibling host variables
    #[serde(default)]
    pub flatten_config_context: bool,
    /// Expand custom fields into sibling host variables
    #[serde(default)]
    pub flatten_custom_fields: bool,
    /// Use the plural group-key naming scheme and wrap scalar values
    #[serde(default)]
    pub plurals: bool,
    /// Fetch interfaces (and their IP addresses) per host
    #[serde(default)]
    pub interfaces: bool,
    /// Fetch services per host
    #[serde(default)]
    pub services: bool,
    /// Extractor keys that produce groups
    #[serde(default)]
    pub group_by: Vec<String>,
    /// Suppress the `<grouping>_` prefix on group names
    #[serde(default)]
    pub group_names_raw: bool,
    /// Filter predicates applied to both devices and virtual machines
    #[serde(default)]
    pub query_filters: Vec<Predicate>,
    /// Filter predicates applied to devices only
    #[serde(default)]
    pub device_query_filters: Vec<Predicate>,
    /// Filter predicates applied to virtual machines only
    #[serde(default)]
    pub vm_query_filters: Vec<Predicate>,
    /// Serve repeated fetches of the same URL from a response cache
    #[serde(default)]
    pub cache: bool,
    /// Cache lifetime in seconds
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl: u64,
}

fn default_timeout() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl() -> u64 {
    3600
}

impl InventoryConfig {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            InventoryError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        toml::from_str(&raw)
            .map_err(|e| InventoryError::Config(format!("cannot parse {}: {e}", path.display())))
    }

    /// The API base URL, normalized to end with a single `/` so that
    /// resource paths can be joined onto it.
    ///
    /// # Errors
    /// Returns an error naming `api_endpoint` if the value is empty or not
    /// a valid URL.
    pub fn endpoint_url(&self) -> Result<Url> {
        let trimmed = self.api_endpoint.trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(InventoryError::Config(
                "api_endpoint must not be empty".to_string(),
            ));
        }
        Url::parse(&format!("{trimmed}/"))
            .map_err(|e| InventoryError::Config(format!("api_endpoint is not a valid URL: {e}")))
    }

    /// Per-request timeout as a [`Duration`]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Cache lifetime, or `None` when caching is disabled
    #[must_use]
    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache.then(|| Duration::from_secs(self.cache_ttl))
    }
}
