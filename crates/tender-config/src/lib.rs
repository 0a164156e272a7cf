//! # tender-config
//!
//! Layered configuration loading for the tender workspace using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`TENDER_*` prefix, `__` as separator)
//! 2. Project-level `.tender/config.toml` (or `<config-dir>/config.toml`)
//! 3. User-level `~/.config/tender/config.toml`
//! 4. Built-in defaults
//!
//! `TENDER_RECONCILE__PRICE_TOLERANCE` maps to `reconcile.price_tolerance`,
//! `TENDER_DATABASE__PATH` to `database.path`.
//!
//! ```no_run
//! use tender_config::TenderConfig;
//!
//! let config = TenderConfig::load_with_dotenv().expect("config");
//! println!("store: {}", config.database.path);
//! ```

mod database;
mod error;
mod general;
mod reconcile;

pub use database::DatabaseConfig;
pub use error::ConfigError;
pub use general::GeneralConfig;
pub use reconcile::ReconcileConfig;

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

/// Directory holding the project-local config and store.
pub const PROJECT_DIR: &str = ".tender";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TenderConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    #[serde(default)]
    pub general: GeneralConfig,
}

impl TenderConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy`; use [`Self::load_with_dotenv`] for `.env` loading.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a source fails to parse or a value is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        Self::extract(Self::figment())
    }

    /// Load configuration with `.env` file support.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load()
    }

    /// Load with the project-local layer read from `dir/config.toml`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn load_from_dir(dir: &Path) -> Result<Self, ConfigError> {
        let env_path = dir.parent().unwrap_or(dir).join(".env");
        if env_path.exists() {
            let _ = dotenvy::from_path(&env_path);
        }
        Self::extract(Self::figment_in(dir))
    }

    /// Build the default provider chain (project layer from `.tender/`).
    #[must_use]
    pub fn figment() -> Figment {
        Self::figment_in(Path::new(PROJECT_DIR))
    }

    /// Build the provider chain with the project layer read from `dir`.
    ///
    /// Public so tests can inspect the figment or stack providers on top.
    #[must_use]
    pub fn figment_in(dir: &Path) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        let local_path = dir.join("config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        figment.merge(Env::prefixed("TENDER_").split("__"))
    }

    /// Validate every section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.path.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "database.path".into(),
                reason: "must not be empty".into(),
            });
        }
        if self.general.default_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "general.default_limit".into(),
                reason: "must be at least 1".into(),
            });
        }
        self.reconcile.validate()
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("tender").join("config.toml"))
    }
}
