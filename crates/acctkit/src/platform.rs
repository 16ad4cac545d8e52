//! Platform identity.
//!
//! The raw distribution name is resolved once into a [`Platform`] family,
//! and policy matches on the family instead of comparing strings.
//!
//! # Example
//!
//! ```
//! use acctkit::Platform;
//!
//! assert_eq!(Platform::from_identity("CentOS"), Platform::RedHat);
//! assert_eq!(Platform::from_identity("Ubuntu"), Platform::Debian);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// Location of the os-release file used by [`detect`].
pub const OS_RELEASE_PATH: &str = "/etc/os-release";

/// Operating system families with distinct account-tool behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    /// Fedora, RedHat, CentOS, OEL, OVS: `useradd` creates homes by default
    RedHat,
    /// Debian, Ubuntu
    Debian,
    /// Solaris: no first-class system accounts
    Solaris,
    /// HP-UX: no first-class system accounts
    HpUx,
    /// Anything else, with the identity it was resolved from
    Other(String),
}

impl Platform {
    /// Resolve a distribution name (case-insensitive).
    pub fn from_identity(identity: &str) -> Self {
        let id = identity.trim().trim_matches('"');
        match id.to_ascii_lowercase().as_str() {
            "fedora" | "redhat" | "rhel" | "centos" | "oel" | "ol" | "ovs" => Platform::RedHat,
            "debian" | "ubuntu" => Platform::Debian,
            "solaris" | "sunos" => Platform::Solaris,
            "hp-ux" | "hpux" => Platform::HpUx,
            _ => Platform::Other(id.to_string()),
        }
    }

    /// Whether `useradd` can create first-class system accounts here.
    pub fn supports_system_users(&self) -> bool {
        !matches!(self, Platform::Solaris | Platform::HpUx)
    }

    /// Whether `useradd` creates a home directory unless told otherwise.
    pub fn creates_home_by_default(&self) -> bool {
        matches!(self, Platform::RedHat)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::RedHat => write!(f, "redhat"),
            Platform::Debian => write!(f, "debian"),
            Platform::Solaris => write!(f, "solaris"),
            Platform::HpUx => write!(f, "hp-ux"),
            Platform::Other(id) => write!(f, "{id}"),
        }
    }
}

/// Detect the host platform from `/etc/os-release`.
pub fn detect() -> Platform {
    detect_from(Path::new(OS_RELEASE_PATH))
}

/// Detect the platform from an os-release style file.
///
/// `ID` is tried first, then each entry of `ID_LIKE`. When the file is
/// missing the compile-time OS name is used.
pub fn detect_from(path: &Path) -> Platform {
    let Ok(content) = fs::read_to_string(path) else {
        log::debug!("{} not readable, using build target OS", path.display());
        return Platform::from_identity(std::env::consts::OS);
    };

    let field = |key: &str| {
        content
            .lines()
            .find_map(|line| line.strip_prefix(key)?.strip_prefix('='))
            .map(|v| v.trim().trim_matches('"').to_string())
    };

    let id = field("ID").unwrap_or_default();
    let platform = Platform::from_identity(&id);
    if !matches!(platform, Platform::Other(_)) {
        return platform;
    }

    field("ID_LIKE")
        .unwrap_or_default()
        .split_whitespace()
        .map(Platform::from_identity)
        .find(|p| !matches!(p, Platform::Other(_)))
        .unwrap_or(platform)
}
