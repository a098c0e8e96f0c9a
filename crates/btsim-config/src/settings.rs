//! Strongly-typed view over a [`crate::LoadedConfig`]'s merged JSON, with
//! the defaults layered config leaves implicit.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::layering::LoadedConfig;

/// `0.03 / 252`, expressed directly in risk-free-per-day micros so
/// `btsim-metrics` never has to divide at runtime.
pub const DEFAULT_RISK_FREE_DAILY_MICROS: i64 = 119; // round(0.03/252 * 1_000_000)

pub const DEFAULT_FEED_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistenceBackend {
    Memory,
    File,
}

impl Default for PersistenceBackend {
    fn default() -> Self {
        PersistenceBackend::Memory
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_route_prefix")]
    pub route_prefix: String,
    /// Bearer token authorizing cross-account operations: deleting every
    /// account at once, or loading/saving a backtest under another
    /// account's name.
    #[serde(default = "default_admin_token")]
    pub admin_token: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            route_prefix: default_route_prefix(),
            admin_token: default_admin_token(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_route_prefix() -> String {
    "/backtest/api/trade/v0.3/".to_string()
}

fn default_admin_token() -> String {
    "btsim-admin-dev-token".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradingSettings {
    #[serde(default)]
    pub default_commission_micros: i64,
    #[serde(default = "default_risk_free_daily_micros")]
    pub risk_free_daily_micros: i64,
    #[serde(default = "default_feed_timeout_secs")]
    pub feed_timeout_secs: u64,
    /// See Open Question on whether a suspended held symbol
    /// blocks trading in every other symbol too. Defaults to narrow
    /// (per-symbol) blocking; see `DESIGN.md`'s Open Question resolution.
    #[serde(default)]
    pub suspension_blocks_all_trading: bool,
}

impl Default for TradingSettings {
    fn default() -> Self {
        Self {
            default_commission_micros: 0,
            risk_free_daily_micros: default_risk_free_daily_micros(),
            feed_timeout_secs: default_feed_timeout_secs(),
            suspension_blocks_all_trading: false,
        }
    }
}

fn default_risk_free_daily_micros() -> i64 {
    DEFAULT_RISK_FREE_DAILY_MICROS
}

fn default_feed_timeout_secs() -> u64 {
    DEFAULT_FEED_TIMEOUT_SECS
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceSettings {
    #[serde(default)]
    pub backend: PersistenceBackend,
    #[serde(default = "default_persistence_root")]
    pub root: String,
}

impl Default for PersistenceSettings {
    fn default() -> Self {
        Self {
            backend: PersistenceBackend::default(),
            root: default_persistence_root(),
        }
    }
}

fn default_persistence_root() -> String {
    "./data/accounts".to_string()
}

/// The fully-resolved configuration a `btsim-daemon` binary runs with.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BtsimConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub trading: TradingSettings,
    #[serde(default)]
    pub persistence: PersistenceSettings,
}

impl BtsimConfig {
    /// Interpret an already-merged, already-canonicalized config as a
    /// [`BtsimConfig`], falling back to defaults for every absent field.
    pub fn from_loaded(loaded: &LoadedConfig) -> Result<Self, ConfigError> {
        serde_json::from_value(loaded.config_json.clone())
            .map_err(|e| ConfigError::Shape(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layering::load_layered_yaml_from_strings;

    #[test]
    fn empty_config_is_all_defaults() {
        let loaded = load_layered_yaml_from_strings(&["{}"]).unwrap();
        let cfg = BtsimConfig::from_loaded(&loaded).unwrap();
        assert_eq!(cfg.server.bind_address, "0.0.0.0:8080");
        assert_eq!(cfg.server.route_prefix, "/backtest/api/trade/v0.3/");
        assert_eq!(
            cfg.trading.risk_free_daily_micros,
            DEFAULT_RISK_FREE_DAILY_MICROS
        );
        assert_eq!(cfg.trading.feed_timeout_secs, DEFAULT_FEED_TIMEOUT_SECS);
        assert!(!cfg.trading.suspension_blocks_all_trading);
        assert_eq!(cfg.persistence.backend, PersistenceBackend::Memory);
    }

    #[test]
    fn partial_overrides_only_replace_named_fields() {
        let yaml = r#"
trading:
  default_commission_micros: 250
  suspension_blocks_all_trading: true
persistence:
  backend: file
  root: "/var/lib/btsim"
"#;
        let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
        let cfg = BtsimConfig::from_loaded(&loaded).unwrap();

        assert_eq!(cfg.trading.default_commission_micros, 250);
        assert!(cfg.trading.suspension_blocks_all_trading);
        // Untouched trading fields keep their default.
        assert_eq!(
            cfg.trading.risk_free_daily_micros,
            DEFAULT_RISK_FREE_DAILY_MICROS
        );

        assert_eq!(cfg.persistence.backend, PersistenceBackend::File);
        assert_eq!(cfg.persistence.root, "/var/lib/btsim");
        // Server section wasn't present at all; still defaulted.
        assert_eq!(cfg.server.bind_address, "0.0.0.0:8080");
    }

    #[test]
    fn layered_override_wins_over_base() {
        let base = r#"
server:
  bind_address: "0.0.0.0:8080"
"#;
        let overlay = r#"
server:
  bind_address: "127.0.0.1:9090"
"#;
        let loaded = load_layered_yaml_from_strings(&[base, overlay]).unwrap();
        let cfg = BtsimConfig::from_loaded(&loaded).unwrap();
        assert_eq!(cfg.server.bind_address, "127.0.0.1:9090");
    }
}
