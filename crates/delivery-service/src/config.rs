//! # Service Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     DELIVERY_DB_PATH=/srv/shop/delivery.db                             │
//! │     DELIVERY_GLOBAL_VAT_BPS=2000                                       │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     $DELIVERY_CONFIG, or delivery.toml in the platform config dir      │
//! │     ~/.config/delivery/delivery.toml (Linux)                           │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     platform data dir, 20% VAT, legacy import on                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # delivery.toml
//! database_path = "/srv/shop/delivery.db"
//! global_vat_rate_bps = 2000     # 20%
//! shipping_vat_rate_bps = 500    # optional, tried before the global rate
//! max_connections = 5
//! run_legacy_migration = true
//! ```
//!
//! ## Environment Variables
//! | Variable                        | Field                   |
//! |---------------------------------|-------------------------|
//! | `DELIVERY_CONFIG`               | config file path        |
//! | `DELIVERY_DB_PATH`              | `database_path`         |
//! | `DELIVERY_GLOBAL_VAT_BPS`       | `global_vat_rate_bps`   |
//! | `DELIVERY_SHIPPING_VAT_BPS`     | `shipping_vat_rate_bps` |
//! | `DELIVERY_MAX_CONNECTIONS`      | `max_connections`       |
//! | `DELIVERY_RUN_LEGACY_MIGRATION` | `run_legacy_migration`  |

use std::env;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use delivery_core::{StaticTaxRates, TaxRate};

pub const CONFIG_FILE_ENV: &str = "DELIVERY_CONFIG";
pub const CONFIG_FILE_NAME: &str = "delivery.toml";
pub const DATABASE_FILE_NAME: &str = "delivery.db";

// =============================================================================
// Config Error
// =============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Failed to read config file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Could not prepare data directory {path}: {source}")]
    DataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// =============================================================================
// Service Config
// =============================================================================

/// Delivery service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// SQLite database file.
    pub database_path: PathBuf,

    /// Store standard VAT rate in basis points (2000 = 20%).
    pub global_vat_rate_bps: u32,

    /// Shipping-specific VAT rate, tried before the standard rate.
    pub shipping_vat_rate_bps: Option<u32>,

    /// Maximum pool connections.
    pub max_connections: u32,

    /// Import the old zone blob on startup.
    pub run_legacy_migration: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            database_path: default_database_path(),
            global_vat_rate_bps: 2000,
            shipping_vat_rate_bps: None,
            max_connections: 5,
            run_legacy_migration: true,
        }
    }
}

impl ServiceConfig {
    /// Loads configuration: defaults, then the TOML file, then environment.
    ///
    /// A missing config file is not an error; an unreadable or malformed
    /// one is.
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var(CONFIG_FILE_ENV)
            .ok()
            .map(PathBuf::from)
            .or_else(default_config_path);
        Self::load_from(path.as_deref(), |key| env::var(key).ok())
    }

    /// Loads from an explicit file and variable lookup.
    pub fn load_from<F>(path: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) if path.exists() => {
                info!(path = %path.display(), "Loading delivery config from file");
                let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml(&contents)?
            }
            Some(path) => {
                debug!(path = %path.display(), "Config file not found, using defaults");
                ServiceConfig::default()
            }
            None => ServiceConfig::default(),
        };

        config.apply_env_overrides(lookup)?;
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML document; absent keys keep their defaults.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("DELIVERY_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database_path = PathBuf::from(path);
        }

        if let Some(value) = lookup("DELIVERY_GLOBAL_VAT_BPS") {
            self.global_vat_rate_bps = parse_var("DELIVERY_GLOBAL_VAT_BPS", &value)?;
        }

        if let Some(value) = lookup("DELIVERY_SHIPPING_VAT_BPS") {
            self.shipping_vat_rate_bps = if value.trim().is_empty() {
                None
            } else {
                Some(parse_var("DELIVERY_SHIPPING_VAT_BPS", &value)?)
            };
        }

        if let Some(value) = lookup("DELIVERY_MAX_CONNECTIONS") {
            self.max_connections = parse_var("DELIVERY_MAX_CONNECTIONS", &value)?;
        }

        if let Some(value) = lookup("DELIVERY_RUN_LEGACY_MIGRATION") {
            self.run_legacy_migration = parse_var("DELIVERY_RUN_LEGACY_MIGRATION", &value)?;
        }

        Ok(())
    }

    /// Rejects rates above 100% and an empty pool.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.global_vat_rate_bps > 10_000 {
            return Err(ConfigError::InvalidValue("global_vat_rate_bps".to_string()));
        }
        if self.shipping_vat_rate_bps.is_some_and(|bps| bps > 10_000) {
            return Err(ConfigError::InvalidValue("shipping_vat_rate_bps".to_string()));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue("max_connections".to_string()));
        }
        Ok(())
    }

    /// Tax rates for global-VAT zones.
    pub fn tax_rates(&self) -> StaticTaxRates {
        StaticTaxRates {
            standard: Some(TaxRate::from_bps(self.global_vat_rate_bps)),
            shipping: self.shipping_vat_rate_bps.map(TaxRate::from_bps),
        }
    }

    /// Creates the directory holding the database file.
    pub fn ensure_data_dir(&self) -> Result<(), ConfigError> {
        match self.database_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => {
                std::fs::create_dir_all(dir).map_err(|source| ConfigError::DataDir {
                    path: dir.to_path_buf(),
                    source,
                })
            }
            _ => Ok(()),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(name.to_string()))
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "postcode", "delivery")
}

/// Platform data directory, or the working directory when none exists.
///
/// - **macOS**: `~/Library/Application Support/com.postcode.delivery/delivery.db`
/// - **Linux**: `~/.local/share/delivery/delivery.db`
pub fn default_database_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join(DATABASE_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(DATABASE_FILE_NAME))
}

pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use delivery_core::{TaxClass, TaxRateProvider};
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::load_from(None, |_| None).unwrap();
        assert_eq!(config.global_vat_rate_bps, 2000);
        assert_eq!(config.shipping_vat_rate_bps, None);
        assert_eq!(config.max_connections, 5);
        assert!(config.run_legacy_migration);
        assert!(config.database_path.ends_with(DATABASE_FILE_NAME));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ServiceConfig::from_toml("global_vat_rate_bps = 500\n").unwrap();
        assert_eq!(config.global_vat_rate_bps, 500);
        assert_eq!(config.max_connections, 5);
        assert!(config.run_legacy_migration);
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(
            ServiceConfig::from_toml("global_vat_rate_bps = \"lots\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let env = vars(&[
            ("DELIVERY_DB_PATH", "/tmp/shop/delivery.db"),
            ("DELIVERY_SHIPPING_VAT_BPS", "500"),
            ("DELIVERY_RUN_LEGACY_MIGRATION", "false"),
        ]);
        let config = ServiceConfig::load_from(None, |key| env.get(key).cloned()).unwrap();

        assert_eq!(config.database_path, PathBuf::from("/tmp/shop/delivery.db"));
        assert_eq!(config.shipping_vat_rate_bps, Some(500));
        assert!(!config.run_legacy_migration);
    }

    #[test]
    fn test_env_wins_over_file() {
        let path = std::env::temp_dir().join(format!("delivery-config-{}.toml", std::process::id()));
        std::fs::write(&path, "global_vat_rate_bps = 500\nmax_connections = 2\n").unwrap();

        let env = vars(&[("DELIVERY_GLOBAL_VAT_BPS", "1750")]);
        let config = ServiceConfig::load_from(Some(path.as_path()), |key| env.get(key).cloned()).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.global_vat_rate_bps, 1750);
        assert_eq!(config.max_connections, 2);
    }

    #[test]
    fn test_invalid_env_value() {
        let env = vars(&[("DELIVERY_MAX_CONNECTIONS", "many")]);
        let err = ServiceConfig::load_from(None, |key| env.get(key).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(name) if name == "DELIVERY_MAX_CONNECTIONS"));
    }

    #[test]
    fn test_rate_above_hundred_percent_rejected() {
        let env = vars(&[("DELIVERY_GLOBAL_VAT_BPS", "10001")]);
        assert!(ServiceConfig::load_from(None, |key| env.get(key).cloned()).is_err());
    }

    #[test]
    fn test_tax_rates() {
        let config = ServiceConfig {
            shipping_vat_rate_bps: Some(500),
            ..ServiceConfig::default()
        };
        let rates = config.tax_rates();
        assert_eq!(rates.rate_for(TaxClass::Standard), Some(TaxRate::from_bps(2000)));
        assert_eq!(rates.rate_for(TaxClass::Shipping), Some(TaxRate::from_bps(500)));
    }
}
