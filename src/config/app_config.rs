use std::env;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use log::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    MongoDb,
    Memory,
}

impl FromStr for StoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mongodb" | "mongo" => Ok(StoreKind::MongoDb),
            "memory" => Ok(StoreKind::Memory),
            other => bail!("unknown store kind '{other}', expected 'mongodb' or 'memory'"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_address: String,
    pub port: u16,
    pub store: StoreKind,
    pub mongodb_uri: String,
    pub mongodb_database: String,
    pub store_timeout_ms: u64,
    pub allowed_origins: Vec<String>,
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| {
            lookup(key).filter(|v| !v.trim().is_empty()).unwrap_or_else(|| {
                info!("{key} not set, using default: {default}");
                default.to_string()
            })
        };

        let port = get("PORT", "8080")
            .parse::<u16>()
            .context("PORT must be a valid port number")?;
        let store = get("ANALYTICS_STORE", "mongodb")
            .parse::<StoreKind>()
            .context("Invalid ANALYTICS_STORE")?;
        let store_timeout_ms = get("STORE_TIMEOUT_MS", "5000")
            .parse::<u64>()
            .context("STORE_TIMEOUT_MS must be a whole number of milliseconds")?;
        let allowed_origins = get(
            "ALLOWED_ORIGINS",
            "http://localhost:5173,http://localhost:4173",
        )
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect();

        Ok(Self {
            bind_address: get("BIND_ADDRESS", "127.0.0.1"),
            port,
            store,
            mongodb_uri: get("MONGODB_URI", "mongodb://localhost:27017"),
            mongodb_database: get("MONGODB_DATABASE", "visitor_analytics"),
            store_timeout_ms,
            allowed_origins,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.store, StoreKind::MongoDb);
        assert_eq!(config.mongodb_database, "visitor_analytics");
        assert_eq!(config.store_timeout_ms, 5000);
        assert_eq!(config.allowed_origins.len(), 2);
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("PORT", "9000"),
            ("ANALYTICS_STORE", "Memory"),
            ("ALLOWED_ORIGINS", "https://admin.example.com, ,https://example.com"),
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.store, StoreKind::Memory);
        assert_eq!(
            config.allowed_origins,
            vec!["https://admin.example.com", "https://example.com"]
        );
    }

    #[test]
    fn rejects_malformed_numbers() {
        assert!(config_from(&[("PORT", "eighty")]).is_err());
        assert!(config_from(&[("STORE_TIMEOUT_MS", "-1")]).is_err());
        assert!(config_from(&[("ANALYTICS_STORE", "postgres")]).is_err());
    }
}
