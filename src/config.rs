//! Process-wide bridge configuration.
//!
//! Fixed numeric limits live here rather than in mutable globals. The
//! configuration is installed at most once; every reader afterwards gets the
//! same `&'static` value.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

static CONFIG: OnceLock<BridgeConfig> = OnceLock::new();

/// Bridge configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Earliest accepted transaction timestamp (unix seconds).
    pub min_timestamp: i64,
    /// Latest accepted transaction timestamp (unix seconds).
    pub max_timestamp: i64,
    /// Maximum input coins per transaction artifact.
    pub max_inputs: usize,
    /// Maximum output coins per transaction artifact.
    pub max_outputs: usize,
    /// Maximum size of a transaction's `Info` field in bytes.
    pub max_info_size: usize,
    /// Maximum size of a coin's info (payment message) in bytes.
    pub max_coin_info_size: usize,
    /// Leading version byte of the checksummed encodings.
    pub encoding_version: u8,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            // 2019-01-01T00:00:00Z
            min_timestamp: 1_546_300_800,
            // 2100-01-01T00:00:00Z
            max_timestamp: 4_102_444_800,
            max_inputs: 32,
            max_outputs: 32,
            max_info_size: 512,
            max_coin_info_size: 255,
            encoding_version: 0,
        }
    }
}

impl BridgeConfig {
    /// Loads configuration from `.env` file, TOML file, and environment variables.
    ///
    /// Configuration priority (highest to lowest):
    /// 1. Environment variables with `BRIDGE_` prefix (e.g., `BRIDGE_MAX_INPUTS=16`)
    /// 2. TOML configuration file (if exists)
    /// 3. Built-in defaults
    ///
    /// The TOML file path can be set via `BRIDGE_CONFIG_PATH`. If not set, it
    /// defaults to `./config/bridge.toml`. A missing file is silently skipped.
    ///
    /// # Errors
    /// Returns an error if the configuration is malformed.
    #[allow(clippy::result_large_err)]
    pub fn from_env() -> figment::error::Result<Self> {
        use figment::providers::{Env, Format, Serialized, Toml};
        use figment::Figment;

        let _ = dotenvy::dotenv();

        let config_path = std::env::var("BRIDGE_CONFIG_PATH")
            .unwrap_or_else(|_| "config/bridge.toml".to_string());

        Figment::new()
            .merge(Serialized::defaults(BridgeConfig::default()))
            .merge(Toml::file(&config_path))
            .merge(Env::prefixed("BRIDGE_").ignore(&["CONFIG_PATH", "DEFAULT_TIMESTAMP"]))
            .extract()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns an error message describing the first inconsistent value.
    pub fn validate(&self) -> Result<(), String> {
        if self.min_timestamp < 0 {
            return Err("min_timestamp cannot be negative".to_string());
        }

        if self.min_timestamp > self.max_timestamp {
            return Err(format!(
                "min_timestamp ({}) exceeds max_timestamp ({})",
                self.min_timestamp, self.max_timestamp
            ));
        }

        if self.max_inputs == 0 {
            return Err("max_inputs cannot be zero".to_string());
        }

        if self.max_outputs == 0 {
            return Err("max_outputs cannot be zero".to_string());
        }

        Ok(())
    }
}

/// Installs `config` as the process-wide configuration.
///
/// # Errors
/// Fails if a configuration was already installed or read, or if `config`
/// is inconsistent.
pub fn install(config: BridgeConfig) -> Result<(), String> {
    config.validate()?;
    CONFIG
        .set(config)
        .map_err(|_| "bridge configuration is already initialized".to_string())
}

/// Returns the process-wide configuration, initializing it with defaults if
/// nothing was installed.
pub fn get() -> &'static BridgeConfig {
    CONFIG.get_or_init(BridgeConfig::default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(BridgeConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_inverted_window() {
        let config = BridgeConfig {
            min_timestamp: 10,
            max_timestamp: 5,
            ..BridgeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_limits() {
        let config = BridgeConfig {
            max_inputs: 0,
            ..BridgeConfig::default()
        };
        assert!(config.validate().is_err());

        let config = BridgeConfig {
            max_outputs: 0,
            ..BridgeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn get_returns_same_instance() {
        assert!(core::ptr::eq(get(), get()));
    }
}
