//! Configuration schema for imgwarm
//!
//! Configuration is stored at `~/.config/imgwarm/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Local cache settings
    pub cache: CacheConfig,

    /// Registry access settings
    pub registry: RegistryConfig,

    /// Build defaults
    pub build: BuildConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Local image cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache directory (defaults to the user cache dir)
    pub dir: Option<PathBuf>,

    /// Hours before a cached image is considered stale
    pub ttl_hours: u64,

    /// Images warmed concurrently
    pub jobs: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            ttl_hours: 336,
            jobs: 4,
        }
    }
}

impl CacheConfig {
    /// The configured cache directory, or the platform default
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("imgwarm")
        })
    }
}

/// Registry access settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Registries contacted over plain HTTP
    pub insecure: Vec<String>,

    /// Accept invalid TLS certificates
    pub skip_tls_verify: bool,

    /// Docker config.json used for credentials
    pub docker_config: Option<PathBuf>,
}

/// Build defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Default platform (os/arch[/variant]); host platform when unset
    pub platform: Option<String>,
}
