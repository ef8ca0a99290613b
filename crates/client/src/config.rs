//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `TUNDRA_API_BASE_URL` - Base URL of the storefront REST backend
//!
//! ## Optional
//! - `TUNDRA_STORAGE_PATH` - Path of the local state file (default:
//!   `.tundra-state.json`; set to `:memory:` for a non-persistent session)
//! - `TUNDRA_HTTP_TIMEOUT_SECS` - Request timeout in seconds (default: 30)
//! - `TUNDRA_CATALOG_CACHE_TTL_SECS` - Catalog cache TTL in seconds
//!   (default: 300)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_STORAGE_PATH: &str = ".tundra-state.json";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CATALOG_CACHE_TTL_SECS: u64 = 300;

/// Sentinel storage path selecting the in-memory backend.
pub const MEMORY_STORAGE: &str = ":memory:";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Where session and guest-cart state is persisted between runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageLocation {
    /// JSON state file on disk.
    File(PathBuf),
    /// Keep state in memory only; it is lost when the process exits.
    Memory,
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the storefront REST backend.
    pub api_base_url: Url,
    /// Local persistence backend for session and guest-cart state.
    pub storage: StorageLocation,
    /// HTTP request timeout.
    pub http_timeout: Duration,
    /// Time-to-live for cached catalog responses.
    pub catalog_cache_ttl: Duration,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration by resolving variables through `lookup`.
    ///
    /// `from_env` passes `std::env::var`; tests pass a closure over a map.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let base_url_raw = lookup("TUNDRA_API_BASE_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("TUNDRA_API_BASE_URL".into()))?;
        let api_base_url = Url::parse(&base_url_raw).map_err(|e| {
            ConfigError::InvalidEnvVar("TUNDRA_API_BASE_URL".into(), e.to_string())
        })?;
        if !matches!(api_base_url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEnvVar(
                "TUNDRA_API_BASE_URL".into(),
                format!("unsupported scheme: {}", api_base_url.scheme()),
            ));
        }

        let storage = match lookup("TUNDRA_STORAGE_PATH") {
            Some(path) if path == MEMORY_STORAGE => StorageLocation::Memory,
            Some(path) if path.trim().is_empty() => {
                return Err(ConfigError::InvalidEnvVar(
                    "TUNDRA_STORAGE_PATH".into(),
                    "path cannot be empty".into(),
                ));
            }
            Some(path) => StorageLocation::File(PathBuf::from(path)),
            None => StorageLocation::File(PathBuf::from(DEFAULT_STORAGE_PATH)),
        };

        let http_timeout = parse_secs(
            &lookup,
            "TUNDRA_HTTP_TIMEOUT_SECS",
            DEFAULT_HTTP_TIMEOUT_SECS,
        )?;
        let catalog_cache_ttl = parse_secs(
            &lookup,
            "TUNDRA_CATALOG_CACHE_TTL_SECS",
            DEFAULT_CATALOG_CACHE_TTL_SECS,
        )?;

        Ok(Self {
            api_base_url,
            storage,
            http_timeout,
            catalog_cache_ttl,
        })
    }
}

fn parse_secs(
    lookup: impl Fn(&str) -> Option<String>,
    name: &str,
    default: u64,
) -> Result<Duration, ConfigError> {
    let secs = match lookup(name) {
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar(name.into(), e.to_string()))?,
        None => default,
    };
    if secs == 0 {
        return Err(ConfigError::InvalidEnvVar(
            name.into(),
            "must be greater than zero".into(),
        ));
    }
    Ok(Duration::from_secs(secs))
}
