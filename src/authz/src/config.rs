//! Access-control configuration
//!
//! Loaded from a JSON file and/or environment variables:
//! - `BROKER_AUTHZ_CONFIG` - path to a JSON config file (optional)
//! - `BROKER_AUTHZ_ENABLED` - `true`/`false` (default: true)
//! - `BROKER_AUTHZ_DATABASE_URL` - PostgreSQL URL (default: in-memory store)
//! - `BROKER_AUTHZ_ADMIN_GROUP` - administrative group (default: admin)
//! - `BROKER_AUTHZ_ADMIN_PRINCIPAL` - owner of built-in resources (default: admin)
//! - `BROKER_AUTHZ_BIND_ADDR` - management API address (default: 0.0.0.0:8080)

use crate::user_store::User;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Access-control configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// When false every check is approved
    pub authorization_enabled: bool,

    /// PostgreSQL connection string; `None` selects the in-memory store
    pub database_url: Option<String>,

    /// Group granted every scope at bootstrap
    pub admin_group: String,

    /// Owner recorded on built-in resources
    pub admin_principal: String,

    /// User directory backing group resolution
    pub users: Vec<User>,

    /// Management API listen address
    pub bind_addr: SocketAddr,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            authorization_enabled: true,
            database_url: None,
            admin_group: "admin".to_string(),
            admin_principal: "admin".to_string(),
            users: vec![User {
                name: "admin".to_string(),
                groups: vec!["admin".to_string()],
            }],
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

impl AuthConfig {
    /// Load configuration from a JSON file; missing keys take defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup("BROKER_AUTHZ_CONFIG") {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(value) = lookup("BROKER_AUTHZ_ENABLED") {
            config.authorization_enabled = parse_bool("BROKER_AUTHZ_ENABLED", &value)?;
        }
        if let Some(value) = lookup("BROKER_AUTHZ_DATABASE_URL") {
            config.database_url = Some(value).filter(|url| !url.is_empty());
        }
        if let Some(value) = lookup("BROKER_AUTHZ_ADMIN_GROUP") {
            config.admin_group = non_empty("BROKER_AUTHZ_ADMIN_GROUP", value)?;
        }
        if let Some(value) = lookup("BROKER_AUTHZ_ADMIN_PRINCIPAL") {
            config.admin_principal = non_empty("BROKER_AUTHZ_ADMIN_PRINCIPAL", value)?;
        }
        if let Some(value) = lookup("BROKER_AUTHZ_BIND_ADDR") {
            config.bind_addr = value.parse().map_err(|_| ConfigError::InvalidValue {
                key: "BROKER_AUTHZ_BIND_ADDR",
                value,
            })?;
        }

        Ok(config)
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}

fn non_empty(key: &'static str, value: String) -> Result<String, ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::InvalidValue { key, value });
    }
    Ok(value)
}
