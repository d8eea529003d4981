//! Error types for imgwarm
//!
//! All modules use `WarmResult<T>` as their return type.

use crate::cache::CacheState;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for imgwarm operations
pub type WarmResult<T> = Result<T, WarmError>;

/// All errors that can occur while resolving and warming images
#[derive(Error, Debug)]
pub enum WarmError {
    // Resolution errors
    /// Missing or unreadable; both mean there is nothing to resolve
    #[error("Dockerfile not found: {path} ({reason})")]
    DockerfileNotFound { path: PathBuf, reason: String },

    #[error("Failed to parse Dockerfile {path}: {reason}")]
    DockerfileParse { path: PathBuf, reason: String },

    #[error("Unresolved variable ${{{name}}} in `{text}`")]
    UnresolvedVariable { name: String, text: String },

    #[error("Bad substitution in `{text}`: {reason}")]
    BadSubstitution { text: String, reason: String },

    #[error("Invalid build argument '{0}': expected NAME=VALUE")]
    InvalidBuildArg(String),

    // Cache-state sentinel
    #[error("Image already cached: {reference} ({state}, key {key})")]
    AlreadyCached {
        reference: String,
        key: String,
        state: CacheState,
    },

    // Fetch errors
    #[error("Invalid image reference '{reference}': {reason}")]
    InvalidReference { reference: String, reason: String },

    #[error("Image pull failed: {image}: {reason}")]
    ImagePull { image: String, reason: String },

    #[error("Invalid platform '{0}': expected os/arch[/variant]")]
    InvalidPlatform(String),

    #[error("Failed to read registry credentials from {path}: {reason}")]
    Credentials { path: PathBuf, reason: String },

    // Store errors
    #[error("Cache store error at {path}: {reason}")]
    CacheStore { path: PathBuf, reason: String },

    #[error("Corrupt cache entry {path}: {reason}")]
    CacheEntryCorrupt { path: PathBuf, reason: String },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // Batch errors
    #[error("Failed to warm {failed} of {total} image(s)")]
    WarmFailed { failed: usize, total: usize },

    // General errors
    #[error("{0}")]
    User(String),
}

impl WarmError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a cache store error
    pub fn store(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::CacheStore {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an image pull error
    pub fn pull(image: impl Into<String>, reason: impl ToString) -> Self {
        Self::ImagePull {
            image: image.into(),
            reason: reason.to_string(),
        }
    }

    /// True when the image was already present in the local cache
    pub fn is_already_cached(&self) -> bool {
        matches!(self, Self::AlreadyCached { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::DockerfileNotFound { .. } => Some("Pass the Dockerfile path with: -f <path>"),
            Self::UnresolvedVariable { .. } => {
                Some("Declare a default with ARG NAME=value or pass --build-arg NAME=value")
            }
            Self::InvalidBuildArg(_) => Some("Build arguments use the form --build-arg NAME=VALUE"),
            Self::InvalidPlatform(_) => Some("Platforms look like linux/amd64 or linux/arm/v7"),
            Self::AlreadyCached { .. } => Some("Use --force to fetch the image again"),
            Self::WarmFailed { .. } => Some("Re-run with -v for per-image details"),
            Self::CacheStore { .. } => Some("Check that the cache directory is writable (--cache-dir)"),
            _ => None,
        }
    }
}

/// Whether `err` signals that the image was already cached, fresh or stale.
///
/// Holds for no other error kind, including fetch, parse, and probe I/O errors.
pub fn is_already_cached(err: &WarmError) -> bool {
    err.is_already_cached()
}
