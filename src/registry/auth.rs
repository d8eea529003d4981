//! Registry credentials
//!
//! Reads `auths` entries from the docker `config.json` written by a prior
//! login. Nothing here ever writes credentials.

use crate::error::{WarmError, WarmResult};
use base64::Engine;
use oci_distribution::secrets::RegistryAuth;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

const DOCKER_HUB: &str = "docker.io";

/// Docker config.json layout (only the parts we read)
#[derive(Debug, Default, Deserialize)]
struct DockerConfigFile {
    #[serde(default)]
    auths: HashMap<String, AuthEntry>,
}

/// Credentials for one registry
#[derive(Debug, Deserialize)]
struct AuthEntry {
    /// Base64 "username:password"
    auth: Option<String>,
    username: Option<String>,
    password: Option<String>,
}

/// Basic credentials keyed by normalized registry host
#[derive(Debug, Default)]
pub struct DockerCredentials {
    entries: HashMap<String, (String, String)>,
}

impl DockerCredentials {
    /// `$DOCKER_CONFIG/config.json`, else `~/.docker/config.json`
    pub fn default_path() -> PathBuf {
        std::env::var("DOCKER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .map(|h| h.join(".docker"))
                    .unwrap_or_else(|| PathBuf::from(".docker"))
            })
            .join("config.json")
    }

    /// Load credentials from `path` (or the default path). A missing file is
    /// not an error: every registry is then accessed anonymously.
    pub async fn load(path: Option<&Path>) -> WarmResult<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Docker config not found at {}", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(WarmError::io(
                    format!("reading docker config {}", path.display()),
                    e,
                ))
            }
        };

        Self::parse(&content, &path)
    }

    fn parse(content: &str, path: &Path) -> WarmResult<Self> {
        let file: DockerConfigFile =
            serde_json::from_str(content).map_err(|e| WarmError::Credentials {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let mut entries = HashMap::new();
        for (server, entry) in file.auths {
            let creds = match (entry.username, entry.password, entry.auth) {
                (Some(user), Some(pass), _) if !user.is_empty() => Some((user, pass)),
                (_, _, Some(auth)) if !auth.is_empty() => Some(decode_auth(&auth, path)?),
                _ => None,
            };
            if let Some(creds) = creds {
                entries.insert(normalize_registry(&server), creds);
            }
        }

        debug!("Loaded credentials for {} registries", entries.len());
        Ok(Self { entries })
    }

    /// Username and password for a registry host, if configured
    pub fn lookup(&self, registry: &str) -> Option<(&str, &str)> {
        self.entries
            .get(&normalize_registry(registry))
            .map(|(user, pass)| (user.as_str(), pass.as_str()))
    }

    /// Auth for a registry host: basic when configured, else anonymous
    pub fn registry_auth(&self, registry: &str) -> RegistryAuth {
        match self.lookup(registry) {
            Some((user, pass)) => {
                debug!("Using stored credentials for {}", registry);
                RegistryAuth::Basic(user.to_string(), pass.to_string())
            }
            None => RegistryAuth::Anonymous,
        }
    }
}

fn decode_auth(auth: &str, path: &Path) -> WarmResult<(String, String)> {
    let invalid = |reason: String| WarmError::Credentials {
        path: path.to_path_buf(),
        reason,
    };

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(auth.trim())
        .map_err(|e| invalid(format!("auth is not base64: {}", e)))?;
    let decoded = String::from_utf8(decoded).map_err(|e| invalid(e.to_string()))?;

    decoded
        .split_once(':')
        .map(|(user, pass)| (user.to_string(), pass.to_string()))
        .ok_or_else(|| invalid("auth is not username:password".to_string()))
}

/// Reduce a config.json server key or registry host to a bare host.
///
/// `https://index.docker.io/v1/`, `registry-1.docker.io` and `docker.io`
/// all name Docker Hub.
pub fn normalize_registry(server: &str) -> String {
    let host = server
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    let host = host.split('/').next().unwrap_or(host).to_ascii_lowercase();

    match host.as_str() {
        "index.docker.io" | "registry-1.docker.io" | "registry.hub.docker.com" => {
            DOCKER_HUB.to_string()
        }
        _ => host,
    }
}
