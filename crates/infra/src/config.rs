//! Storefront configuration loaded from the environment.
//!
//! | Variable | Default |
//! |---|---|
//! | `HARVEST_BIND_ADDR` | `0.0.0.0:8080` |
//! | `DATABASE_URL` | unset (in-memory catalog) |
//! | `HARVEST_CATALOG_FIXTURE` | unset |
//! | `HARVEST_SEARCH_DEFAULT_LIMIT` | `20` |
//! | `HARVEST_SEARCH_MAX_LIMIT` | `100` |
//! | `HARVEST_DB_MAX_CONNECTIONS` | `5` |
//! | `HARVEST_DB_ACQUIRE_TIMEOUT_SECS` | `5` |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use harvest_catalog::filter::DEFAULT_LIMIT;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_MAX_LIMIT: u32 = 100;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorefrontConfig {
    pub bind_addr: String,
    /// `None` means the in-memory catalog is used.
    pub database: Option<DatabaseConfig>,
    pub catalog_fixture: Option<PathBuf>,
    pub default_limit: u32,
    pub max_limit: u32,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            database: None,
            catalog_fixture: None,
            default_limit: DEFAULT_LIMIT,
            max_limit: DEFAULT_MAX_LIMIT,
        }
    }
}

impl StorefrontConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let default_limit = parse_or(&get, "HARVEST_SEARCH_DEFAULT_LIMIT", DEFAULT_LIMIT)?;
        let max_limit = parse_or(&get, "HARVEST_SEARCH_MAX_LIMIT", DEFAULT_MAX_LIMIT)?;
        if default_limit == 0 {
            return Err(invalid("HARVEST_SEARCH_DEFAULT_LIMIT", "0", "must be at least 1"));
        }
        if max_limit < default_limit {
            return Err(invalid(
                "HARVEST_SEARCH_MAX_LIMIT",
                &max_limit.to_string(),
                "must not be below the default limit",
            ));
        }

        let database = match get("DATABASE_URL") {
            Some(url) => {
                let max_connections = parse_or(&get, "HARVEST_DB_MAX_CONNECTIONS", 5u32)?;
                if max_connections == 0 {
                    return Err(invalid("HARVEST_DB_MAX_CONNECTIONS", "0", "must be at least 1"));
                }
                let timeout_secs = parse_or(&get, "HARVEST_DB_ACQUIRE_TIMEOUT_SECS", 5u64)?;
                Some(DatabaseConfig {
                    url,
                    max_connections,
                    acquire_timeout: Duration::from_secs(timeout_secs),
                })
            }
            None => None,
        };

        Ok(Self {
            bind_addr: get("HARVEST_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            database,
            catalog_fixture: get("HARVEST_CATALOG_FIXTURE").map(PathBuf::from),
            default_limit,
            max_limit,
        })
    }
}

fn parse_or<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| invalid(key, &raw, &e.to_string())),
        None => Ok(default),
    }
}

fn invalid(key: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
