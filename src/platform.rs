//! Platform strings (`os/arch[/variant]`)
//!
//! Normalizes platform names the way registries publish them in image
//! indexes, and computes the host default once at startup.

use crate::error::{WarmError, WarmResult};
use std::fmt;
use std::str::FromStr;

/// A normalized OCI platform
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Platform {
    /// Operating system (linux, windows, ...)
    pub os: String,
    /// CPU architecture in OCI naming (amd64, arm64, ...)
    pub architecture: String,
    /// Architecture variant (v7, v6, ...)
    pub variant: Option<String>,
}

impl Platform {
    /// Build a normalized platform from its parts
    pub fn new(os: &str, architecture: &str, variant: Option<&str>) -> Self {
        let os = os.to_ascii_lowercase();
        let (architecture, variant) = normalize_arch(
            &architecture.to_ascii_lowercase(),
            variant.map(str::to_ascii_lowercase).as_deref(),
        );
        Self {
            os,
            architecture,
            variant,
        }
    }

    /// Whether an index entry's platform fields select this platform.
    ///
    /// An entry without a variant matches any variant of the same arch.
    pub fn matches(&self, os: &str, architecture: &str, variant: Option<&str>) -> bool {
        let other = Platform::new(os, architecture, variant);
        if self.os != other.os || self.architecture != other.architecture {
            return false;
        }
        match (&self.variant, &other.variant) {
            (Some(want), Some(have)) => want == have,
            _ => true,
        }
    }

    /// Automatic build arguments derived from this platform, with the given prefix
    /// (`TARGET` or `BUILD`)
    pub fn build_args(&self, prefix: &str) -> Vec<(String, String)> {
        vec![
            (format!("{}PLATFORM", prefix), self.to_string()),
            (format!("{}OS", prefix), self.os.clone()),
            (format!("{}ARCH", prefix), self.architecture.clone()),
            (
                format!("{}VARIANT", prefix),
                self.variant.clone().unwrap_or_default(),
            ),
        ]
    }
}

fn normalize_arch(arch: &str, variant: Option<&str>) -> (String, Option<String>) {
    let variant = variant.filter(|v| !v.is_empty());
    match arch {
        "x86_64" | "x86-64" | "amd64" => ("amd64".to_string(), None),
        "i386" | "i686" | "x86" | "386" => ("386".to_string(), None),
        "aarch64" | "arm64" => {
            let variant = match variant {
                None | Some("8") | Some("v8") => None,
                Some(v) => Some(v.to_string()),
            };
            ("arm64".to_string(), variant)
        }
        "armhf" => ("arm".to_string(), Some("v7".to_string())),
        "armel" => ("arm".to_string(), Some("v6".to_string())),
        // 32-bit userland on a v8 core runs v7 images
        "arm" => {
            let variant = match variant {
                None | Some("7") | Some("v8") | Some("8") => "v7".to_string(),
                Some("5") => "v5".to_string(),
                Some("6") => "v6".to_string(),
                Some(v) => v.to_string(),
            };
            ("arm".to_string(), Some(variant))
        }
        "powerpc64le" | "ppc64le" => ("ppc64le".to_string(), None),
        other => (other.to_string(), variant.map(str::to_string)),
    }
}

impl FromStr for Platform {
    type Err = WarmError;

    fn from_str(s: &str) -> WarmResult<Self> {
        let parts: Vec<&str> = s.trim().split('/').collect();
        match parts.as_slice() {
            [os, arch] if !os.is_empty() && !arch.is_empty() => Ok(Self::new(os, arch, None)),
            [os, arch, variant] if !os.is_empty() && !arch.is_empty() => {
                Ok(Self::new(os, arch, Some(*variant)))
            }
            _ => Err(WarmError::InvalidPlatform(s.to_string())),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.variant {
            Some(variant) => write!(f, "{}/{}/{}", self.os, self.architecture, variant),
            None => write!(f, "{}/{}", self.os, self.architecture),
        }
    }
}

/// The platform of the running host.
///
/// Images are always Linux unless the host OS is Windows.
pub fn default_platform() -> Platform {
    let os = match std::env::consts::OS {
        "windows" => "windows",
        _ => "linux",
    };
    Platform::new(os, std::env::consts::ARCH, None)
}
