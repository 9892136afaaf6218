use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct StorefrontConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub store: StoreBackend,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub run_migrations: bool,
}

/// Where storefront data lives.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl StorefrontConfig {
    pub fn load() -> Result<Self, AppError> {
        // Common config also loads .env and APP__ overrides.
        let common = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod"
            || common.is_production();

        let store: StoreBackend = get_env("STOREFRONT_STORE_BACKEND", Some("postgres"), false)?
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        // The in-memory store never touches the database URL.
        let needs_database = store == StoreBackend::Postgres;
        let url = if needs_database {
            get_env("STOREFRONT_DATABASE_URL", None, is_prod)?
        } else {
            env::var("STOREFRONT_DATABASE_URL").unwrap_or_default()
        };

        Ok(StorefrontConfig {
            common,
            service_name: get_env("STOREFRONT_SERVICE_NAME", Some("storefront-service"), false)?,
            log_level: get_env("STOREFRONT_LOG_LEVEL", Some("info"), false)?,
            otlp_endpoint: env::var("STOREFRONT_OTLP_ENDPOINT")
                .ok()
                .filter(|s| !s.is_empty()),
            store,
            database: DatabaseConfig {
                url: Secret::new(url),
                max_connections: parse_env("STOREFRONT_DB_MAX_CONNECTIONS", 10)?,
                min_connections: parse_env("STOREFRONT_DB_MIN_CONNECTIONS", 1)?,
                run_migrations: parse_env("STOREFRONT_DB_RUN_MIGRATIONS", true)?,
            },
        })
    }

    /// Settings for tests and local runs: in-memory store, ephemeral port.
    pub fn in_memory() -> Self {
        StorefrontConfig {
            common: core_config::Config {
                port: 0,
                ..Default::default()
            },
            service_name: "storefront-service".to_string(),
            log_level: "info".to_string(),
            otlp_endpoint: None,
            store: StoreBackend::Memory,
            database: DatabaseConfig {
                url: Secret::new(String::new()),
                max_connections: 1,
                min_connections: 0,
                run_migrations: false,
            },
        }
    }
}

impl DatabaseConfig {
    pub fn url(&self) -> &str {
        self.url.expose_secret()
    }
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(format!("Invalid store backend: {}", s)),
        }
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val
            .parse()
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!("Invalid {}: {}", key, e))),
        Err(_) => Ok(default),
    }
}
