//! Layered YAML configuration: deep-merge, canonical hash, typed settings.
//! No IO beyond reading the named layer files.

pub mod error;
pub mod layering;
pub mod settings;

pub use error::ConfigError;
pub use layering::{load_layered_yaml, load_layered_yaml_from_strings, LoadedConfig};
pub use settings::{
    BtsimConfig, PersistenceBackend, PersistenceSettings, ServerSettings, TradingSettings,
    DEFAULT_FEED_TIMEOUT_SECS, DEFAULT_RISK_FREE_DAILY_MICROS,
};
