//! Configuration management for the server.

use mirror_engine::{FieldMap, DEFAULT_ID_ATTRIBUTE};
use std::env;
use std::path::PathBuf;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Field holding each record's identity
    pub id_attribute: String,
    /// JSON file with records loaded at startup
    pub seed_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            id_attribute: DEFAULT_ID_ATTRIBUTE.to_string(),
            seed_file: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let host = lookup("HOST").unwrap_or(defaults.host);

        let port = match lookup("PORT") {
            Some(port) => port.parse().map_err(|_| ConfigError::InvalidPort)?,
            None => defaults.port,
        };

        let id_attribute = lookup("ID_ATTRIBUTE").unwrap_or(defaults.id_attribute);
        if id_attribute.trim().is_empty() {
            return Err(ConfigError::EmptyIdAttribute);
        }

        let seed_file = lookup("SEED_FILE")
            .filter(|path| !path.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            host,
            port,
            id_attribute,
            seed_file,
        })
    }

    /// Read the seed records, if a seed file is configured.
    pub fn load_seed(&self) -> Result<Vec<FieldMap>, ConfigError> {
        let Some(path) = &self.seed_file else {
            return Ok(Vec::new());
        };

        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Seed(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&contents)
            .map_err(|e| ConfigError::Seed(format!("{}: {}", path.display(), e)))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid PORT value")]
    InvalidPort,

    #[error("ID_ATTRIBUTE must not be empty")]
    EmptyIdAttribute,

    #[error("Invalid seed file: {0}")]
    Seed(String),
}
