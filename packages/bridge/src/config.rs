//! # Bridge configuration
//!
//! [`BridgeConfig`] is fixed when a [`TownPassAuth`](crate::TownPassAuth) is built.
//! It can be written by hand with the builder helpers or loaded from TOML:
//!
//! ```toml
//! debug = true
//! timeout_ms = 5000
//! auth_endpoint = "/api/auth/townpass"
//! base_url = "https://quests.example.org"   # native targets only
//! ```
//!
//! Every field has a default, so an empty document is the default configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_TIMEOUT_MS: u64 = 3000;
pub const DEFAULT_AUTH_ENDPOINT: &str = "/api/auth/townpass";

/// Longest deadline a browser timer can hold.
pub const MAX_TIMEOUT_MS: u64 = u32::MAX as u64;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Emit per-transport diagnostics.
    #[serde(default)]
    pub debug: bool,

    /// How long a resolution session waits for any transport, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Backend verification endpoint. May be relative to the page origin.
    #[serde(default = "default_auth_endpoint")]
    pub auth_endpoint: String,

    /// Origin used to resolve a relative endpoint where there is no page
    /// origin (native targets).
    #[serde(default)]
    pub base_url: Option<String>,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_auth_endpoint() -> String {
    DEFAULT_AUTH_ENDPOINT.to_string()
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            debug: false,
            timeout_ms: default_timeout_ms(),
            auth_endpoint: default_auth_endpoint(),
            base_url: None,
        }
    }
}

impl BridgeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_auth_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.auth_endpoint = endpoint.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// The session deadline, capped at [`MAX_TIMEOUT_MS`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.min(MAX_TIMEOUT_MS))
    }

    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert!(!config.debug);
        assert_eq!(config.timeout(), Duration::from_millis(3000));
        assert_eq!(config.auth_endpoint, "/api/auth/townpass");
        assert_eq!(config.base_url, None);
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(BridgeConfig::from_toml("").unwrap(), BridgeConfig::default());
    }

    #[test]
    fn test_partial_toml() {
        let config = BridgeConfig::from_toml("debug = true\ntimeout_ms = 750\n").unwrap();
        assert!(config.debug);
        assert_eq!(config.timeout(), Duration::from_millis(750));
        assert_eq!(config.auth_endpoint, DEFAULT_AUTH_ENDPOINT);
    }

    #[test]
    fn test_huge_timeout_is_capped() {
        let config = BridgeConfig::from_toml("timeout_ms = 9223372036854775807\n").unwrap();
        assert_eq!(config.timeout(), Duration::from_millis(u64::from(u32::MAX)));

        let config = BridgeConfig::new().with_timeout(Duration::from_secs(60 * 60 * 24 * 365));
        assert_eq!(config.timeout().as_millis(), u128::from(u32::MAX));
    }

    #[test]
    fn test_toml_roundtrip_with_builders() {
        let config = BridgeConfig::new()
            .with_debug(true)
            .with_timeout(Duration::from_secs(5))
            .with_auth_endpoint("/auth/verify")
            .with_base_url("https://quests.example.org");
        let parsed = BridgeConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed, config);
        assert_eq!(parsed.timeout_ms, 5000);
    }
}
