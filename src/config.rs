use acctkit::{CommandSet, Compat, DesiredAccount, Platform};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("roster"))
}

/// Problems with a loaded config that serde can't catch
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("account '{0}' is declared more than once")]
    DuplicateAccount(String),
    #[error("no config found in {0} (expected config.toml or config.json)")]
    NotFound(String),
}

/// Supported config file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// Detect from file extension, defaulting to TOML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::Json,
            _ => Self::Toml,
        }
    }
}

// ============================================================================
// Roster Config
// ============================================================================

/// Database locations (defaults are the host's well-known paths)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub passwd: String,
    pub group: String,
    pub shadow: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            passwd: acctkit::directory::PASSWD_PATH.to_string(),
            group: acctkit::directory::GROUP_PATH.to_string(),
            shadow: acctkit::shadow::SHADOW_PATH.to_string(),
        }
    }
}

impl PathsConfig {
    pub fn passwd_path(&self) -> PathBuf {
        expand(&self.passwd)
    }

    pub fn group_path(&self) -> PathBuf {
        expand(&self.group)
    }

    pub fn shadow_path(&self) -> PathBuf {
        expand(&self.shadow)
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

/// The desired-state file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RosterConfig {
    /// Distribution name (e.g. "CentOS"); detected when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    /// Legacy create path: emit the system-account flag from useradd
    #[serde(default)]
    pub legacy_system_users: bool,

    /// Run account commands through sudo
    #[serde(default)]
    pub sudo: bool,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub commands: CommandSet,

    #[serde(default)]
    pub users: Vec<DesiredAccount>,
}

impl RosterConfig {
    /// Load from an explicit path, or from the default config directory
    pub fn load(path: Option<&Path>) -> Result<(Self, PathBuf)> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => find_config_file(&config_dir()?)?,
        };
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let config = Self::parse(&content, ConfigFormat::from_path(&path))
            .with_context(|| format!("Invalid config in {}", path.display()))?;
        Ok((config, path))
    }

    /// Parse config text and check it
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self> {
        let config: Self = match format {
            ConfigFormat::Toml => toml::from_str(content).context("Invalid TOML format")?,
            ConfigFormat::Json => serde_json::from_str(content).context("Invalid JSON format")?,
        };
        config.check()?;
        Ok(config)
    }

    /// Reject configs that would make a pass ambiguous
    pub fn check(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for user in &self.users {
            if !seen.insert(user.name.as_str()) {
                return Err(ConfigError::DuplicateAccount(user.name.clone()));
            }
        }
        Ok(())
    }

    /// Resolve the platform, detecting it from the host when unset
    pub fn platform(&self) -> Platform {
        match &self.platform {
            Some(identity) => Platform::from_identity(identity),
            None => acctkit::platform::detect(),
        }
    }

    pub fn compat(&self) -> Compat {
        Compat {
            legacy_system_users: self.legacy_system_users,
        }
    }
}

/// Find config.toml or config.json in a directory
pub fn find_config_file(dir: &Path) -> Result<PathBuf> {
    ["config.toml", "config.json"]
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
        .ok_or_else(|| ConfigError::NotFound(dir.display().to_string()).into())
}
