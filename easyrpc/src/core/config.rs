//! TOML configuration.
//!
//! Typed sections are read through [`Configurable`]; a missing section falls
//! back to the type's serde defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, anyhow};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

/// Trait for types that can be loaded from configuration
///
/// # Example
///
/// ```ignore
/// use serde::Deserialize;
/// use easyrpc::core::config::Configurable;
///
/// #[derive(Debug, Deserialize, Default)]
/// pub struct PushConfig {
///     pub topics: Vec<String>,
/// }
///
/// impl Configurable for PushConfig {
///     const PREFIX: &'static str = "push";
/// }
/// ```
pub trait Configurable: DeserializeOwned + Default {
    /// Section name in the TOML file
    const PREFIX: &'static str;
}

/// Configuration storage with TOML support
pub struct ConfigStore {
    data: toml::Value,
    path: Option<PathBuf>,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::empty()
    }
}

impl ConfigStore {
    /// Create an empty configuration store
    pub fn empty() -> Self {
        Self {
            data: toml::Value::Table(Default::default()),
            path: None,
        }
    }

    /// Create a configuration store from a TOML string
    pub fn parse(content: &str) -> Result<Self> {
        let data: toml::Value =
            toml::from_str(content).map_err(|e| anyhow!("Failed to parse TOML: {}", e))?;
        Ok(Self { data, path: None })
    }

    /// Create a configuration store from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read config file '{}': {}", path.display(), e))?;

        let data: toml::Value = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse TOML in '{}': {}", path.display(), e))?;

        Ok(Self {
            data,
            path: Some(path.to_path_buf()),
        })
    }

    /// Get a typed configuration section
    ///
    /// If the section doesn't exist, returns the default value.
    pub fn get<C: Configurable>(&self) -> Result<C> {
        let Some(section) = self.data.get(C::PREFIX).cloned() else {
            debug!("Config section '{}' missing, using defaults", C::PREFIX);
            return Ok(C::default());
        };

        debug!("Loading config section: {}", C::PREFIX);

        section
            .try_into::<C>()
            .map_err(|e| anyhow!("Failed to deserialize config section '{}': {}", C::PREFIX, e))
    }

    /// Get a raw TOML value by dotted key path, e.g. `"channel.ws_url"`
    pub fn get_raw(&self, key: &str) -> Option<&toml::Value> {
        key.split('.')
            .try_fold(&self.data, |current, part| current.get(part))
    }

    pub fn has_section(&self, prefix: &str) -> bool {
        self.data.get(prefix).is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Merge another configuration into this one; `other` wins
    pub fn merge(&mut self, other: &ConfigStore) {
        merge_toml_values(&mut self.data, &other.data);
    }
}

fn merge_toml_values(base: &mut toml::Value, other: &toml::Value) {
    match (base, other) {
        (toml::Value::Table(base_table), toml::Value::Table(other_table)) => {
            for (key, value) in other_table {
                if let Some(base_value) = base_table.get_mut(key) {
                    merge_toml_values(base_value, value);
                } else {
                    base_table.insert(key.clone(), value.clone());
                }
            }
        }
        (base, other) => {
            *base = other.clone();
        }
    }
}

/// `[channel]` section: socket endpoint and outbound queue
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ChannelConfig {
    /// WebSocket URL of the peer
    #[serde(default = "default_ws_url")]
    pub ws_url: String,

    /// Access token appended to the URL
    #[serde(default)]
    pub access_token: Option<String>,

    /// Outbound messages buffered before sends start failing
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Upper bound of the reconnect back-off
    #[serde(default = "default_max_retry_delay_secs")]
    pub max_retry_delay_secs: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            access_token: None,
            queue_capacity: default_queue_capacity(),
            max_retry_delay_secs: default_max_retry_delay_secs(),
        }
    }
}

impl ChannelConfig {
    /// WebSocket URL with access_token appended if configured
    pub fn ws_url_with_token(&self) -> String {
        match &self.access_token {
            Some(token) if !token.is_empty() => {
                if self.ws_url.contains('?') {
                    format!("{}&access_token={}", self.ws_url, token)
                } else {
                    format!("{}?access_token={}", self.ws_url, token)
                }
            }
            _ => self.ws_url.clone(),
        }
    }

    pub fn max_retry_delay(&self) -> Duration {
        Duration::from_secs(self.max_retry_delay_secs.max(1))
    }
}

fn default_ws_url() -> String {
    "ws://127.0.0.1:8080".to_string()
}

fn default_queue_capacity() -> usize {
    100
}

fn default_max_retry_delay_secs() -> u64 {
    60
}

impl Configurable for ChannelConfig {
    const PREFIX: &'static str = "channel";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_store_yields_defaults() {
        let config: ChannelConfig = ConfigStore::empty().get().unwrap();

        assert_eq!(config.ws_url, "ws://127.0.0.1:8080");
        assert_eq!(config.queue_capacity, 100);
        assert_eq!(config.max_retry_delay(), Duration::from_secs(60));
    }

    #[test]
    fn parse_reads_the_channel_section() {
        let toml = r#"
            [channel]
            ws_url = "ws://peer:9000/rpc"
            access_token = "secret"
            queue_capacity = 8
        "#;

        let store = ConfigStore::parse(toml).unwrap();
        let config: ChannelConfig = store.get().unwrap();

        assert_eq!(config.queue_capacity, 8);
        assert_eq!(config.max_retry_delay_secs, 60);
        assert_eq!(config.ws_url_with_token(), "ws://peer:9000/rpc?access_token=secret");
        assert!(store.has_section("channel"));
        assert!(!store.has_section("other"));
        assert_eq!(
            store.get_raw("channel.ws_url").and_then(|v| v.as_str()),
            Some("ws://peer:9000/rpc")
        );
    }

    #[test]
    fn token_is_appended_to_existing_query() {
        let config = ChannelConfig {
            ws_url: "ws://peer/rpc?v=2".to_string(),
            access_token: Some("t".to_string()),
            ..Default::default()
        };
        assert_eq!(config.ws_url_with_token(), "ws://peer/rpc?v=2&access_token=t");
    }

    #[test]
    fn bad_section_is_an_error() {
        let store = ConfigStore::parse("[channel]\nqueue_capacity = \"many\"").unwrap();
        assert!(store.get::<ChannelConfig>().is_err());
    }

    #[test]
    fn merge_overrides_values() {
        let mut base = ConfigStore::parse(
            r#"
            [channel]
            ws_url = "ws://a"
            queue_capacity = 1
        "#,
        )
        .unwrap();
        let overrides = ConfigStore::parse("[channel]\nws_url = \"ws://b\"").unwrap();

        base.merge(&overrides);

        let config: ChannelConfig = base.get().unwrap();
        assert_eq!(config.ws_url, "ws://b");
        assert_eq!(config.queue_capacity, 1);
    }
}
