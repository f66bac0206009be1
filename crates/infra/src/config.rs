//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! - `HOST` - Bind address (default: 0.0.0.0)
//! - `PORT` - Listen port (default: 3000)
//! - `USE_PERSISTENT_STORES` - `true` selects Postgres, anything else in-memory
//! - `DATABASE_URL` - Postgres connection string (required with persistent stores)
//! - `DATABASE_MAX_CONNECTIONS` - Pool size (default: 5)
//! - `LOW_STOCK_DEFAULT_THRESHOLD` - Threshold used when a request gives none (default: 10)

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use thiserror::Error;

const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Which store backend the service runs against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    InMemory,
    Postgres {
        database_url: String,
        max_connections: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub host: IpAddr,
    pub port: u16,
    pub backend: StoreBackend,
    pub low_stock_default_threshold: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST,
            port: DEFAULT_PORT,
            backend: StoreBackend::InMemory,
            low_stock_default_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// Reads a `.env` file first when one is present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = parse_or(&lookup, "HOST", DEFAULT_HOST)?;
        let port = parse_or(&lookup, "PORT", DEFAULT_PORT)?;
        let low_stock_default_threshold =
            parse_or(&lookup, "LOW_STOCK_DEFAULT_THRESHOLD", DEFAULT_LOW_STOCK_THRESHOLD)?;

        let persistent = lookup("USE_PERSISTENT_STORES")
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let backend = if persistent {
            let database_url = lookup("DATABASE_URL")
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?;
            let max_connections =
                parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?;
            if max_connections == 0 {
                return Err(ConfigError::InvalidEnvVar(
                    "DATABASE_MAX_CONNECTIONS".to_string(),
                    "must be at least 1".to_string(),
                ));
            }
            StoreBackend::Postgres {
                database_url,
                max_connections,
            }
        } else {
            StoreBackend::InMemory
        };

        Ok(Self {
            host,
            port,
            backend,
            low_stock_default_threshold,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Parse `key` when set and non-blank, otherwise fall back to `default`.
fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_to_in_memory_on_port_3000() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.socket_addr().to_string(), "0.0.0.0:3000");
    }

    #[test]
    fn persistent_stores_require_database_url() {
        let err = config(&[("USE_PERSISTENT_STORES", "true")]).unwrap_err();
        assert_eq!(err, ConfigError::MissingEnvVar("DATABASE_URL".to_string()));

        let cfg = config(&[
            ("USE_PERSISTENT_STORES", "TRUE"),
            ("DATABASE_URL", "postgres://localhost/catalog"),
            ("DATABASE_MAX_CONNECTIONS", "12"),
        ])
        .unwrap();
        assert_eq!(
            cfg.backend,
            StoreBackend::Postgres {
                database_url: "postgres://localhost/catalog".to_string(),
                max_connections: 12,
            }
        );
    }

    #[test]
    fn invalid_values_are_reported_with_their_key() {
        let err = config(&[("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "PORT"));

        let err = config(&[("LOW_STOCK_DEFAULT_THRESHOLD", "many")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "LOW_STOCK_DEFAULT_THRESHOLD"));
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = config(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8081"),
            ("LOW_STOCK_DEFAULT_THRESHOLD", "3"),
            ("USE_PERSISTENT_STORES", "false"),
            ("DATABASE_URL", "postgres://ignored"),
        ])
        .unwrap();
        assert_eq!(cfg.socket_addr().to_string(), "127.0.0.1:8081");
        assert_eq!(cfg.low_stock_default_threshold, 3);
        assert_eq!(cfg.backend, StoreBackend::InMemory);
    }
}
