//! Startup Configuration
//!
//! `CoreConfig` is read once at process start, JSON encoded:
//!
//! ```json
//! {
//!   "publishHorizonYears": 10,
//!   "registry": {
//!     "slotGroups": [{ "name": "main", "allowedComponents": ["content"] }],
//!     "templates": [{ "name": "page", "rootTemplate": true, "subTemplates": ["page"] }]
//!   }
//! }
//! ```
//!
//! `FOLIO_PUBLISH_HORIZON_YEARS` overrides the horizon from the environment.

use crate::services::DEFAULT_PUBLISH_HORIZON_YEARS;
use crate::templates::{RegistryConfig, RegistryError, TemplateRegistry};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub const PUBLISH_HORIZON_ENV: &str = "FOLIO_PUBLISH_HORIZON_YEARS";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for {name}: '{value}'")]
    InvalidEnv { name: String, value: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

fn default_publish_horizon_years() -> u32 {
    DEFAULT_PUBLISH_HORIZON_YEARS
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreConfig {
    /// Expiry applied by publish and hide requests, in years from "now"
    #[serde(default = "default_publish_horizon_years")]
    pub publish_horizon_years: u32,

    #[serde(default)]
    pub registry: RegistryConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            publish_horizon_years: DEFAULT_PUBLISH_HORIZON_YEARS,
            registry: RegistryConfig::default(),
        }
    }
}

impl CoreConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a config file; a missing file yields the defaults
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_json_str(&contents)
    }

    /// Apply environment overrides on top of file values
    pub fn apply_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Ok(value) = std::env::var(PUBLISH_HORIZON_ENV) {
            self.publish_horizon_years =
                value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                    name: PUBLISH_HORIZON_ENV.to_string(),
                    value: value.clone(),
                })?;
        }
        Ok(self)
    }

    /// Validate and index the declared templates
    pub fn build_registry(&self) -> Result<TemplateRegistry, ConfigError> {
        Ok(TemplateRegistry::from_config(self.registry.clone())?)
    }
}
