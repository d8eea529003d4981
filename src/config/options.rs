//! Options for one warming run
//!
//! Built once from the config file and CLI flags, then passed by reference
//! to the resolver and the warmer. Nothing mutates them during a run.

use crate::config::Config;
use crate::error::WarmResult;
use crate::platform::{default_platform, Platform};
use std::path::PathBuf;
use std::time::Duration;

/// Local cache options consumed by the probe
#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// Directory holding cache entries
    pub dir: PathBuf,
    /// Age after which an entry is stale
    pub ttl: Duration,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            ttl: Duration::from_secs(336 * 3600),
        }
    }
}

/// TTL for a number of hours; values past `u64` seconds saturate
pub fn ttl_from_hours(hours: u64) -> Duration {
    Duration::from_secs(hours.saturating_mul(3600))
}

/// Registry access options consumed by the fetcher
#[derive(Debug, Clone, Default)]
pub struct RegistryOptions {
    /// Registries contacted over plain HTTP
    pub insecure_registries: Vec<String>,
    /// Accept invalid TLS certificates
    pub skip_tls_verify: bool,
    /// Docker config.json to read credentials from
    pub docker_config: Option<PathBuf>,
}

/// Configuration for a warming run
#[derive(Debug, Clone)]
pub struct WarmerOptions {
    /// Dockerfile whose base images should be warmed
    pub dockerfile_path: Option<PathBuf>,
    /// `NAME=VALUE` overrides, later entries win
    pub build_args: Vec<String>,
    /// Images requested explicitly, warmed before Dockerfile images
    pub images: Vec<String>,
    /// Local cache options
    pub cache: CacheOptions,
    /// Registry options
    pub registry: RegistryOptions,
    /// Platform used when an image names none
    pub platform: Platform,
    /// Skip the cache probe and always fetch
    pub force: bool,
}

impl Default for WarmerOptions {
    fn default() -> Self {
        Self {
            dockerfile_path: None,
            build_args: Vec::new(),
            images: Vec::new(),
            cache: CacheOptions::default(),
            registry: RegistryOptions::default(),
            platform: default_platform(),
            force: false,
        }
    }
}

impl WarmerOptions {
    /// Derive options from the config file; CLI flags are layered on afterwards
    pub fn from_config(config: &Config) -> WarmResult<Self> {
        let platform = match config.build.platform.as_deref() {
            Some(p) if !p.is_empty() => p.parse()?,
            _ => default_platform(),
        };

        Ok(Self {
            cache: CacheOptions {
                dir: config.cache.resolved_dir(),
                ttl: ttl_from_hours(config.cache.ttl_hours),
            },
            registry: RegistryOptions {
                insecure_registries: config.registry.insecure.clone(),
                skip_tls_verify: config.registry.skip_tls_verify,
                docker_config: config.registry.docker_config.clone(),
            },
            platform,
            ..Default::default()
        })
    }
}
