//! Optional access to the shadow password database.
//!
//! Whether the host lets us read shadow data is decided once, when the
//! accessor is built. Every getter then returns `None` when the capability
//! is missing or the account has no entry; absence is never an error.

use crate::types::ShadowEntry;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Default location of the shadow database.
pub const SHADOW_PATH: &str = "/etc/shadow";

/// Whether shadow data can be read on this host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowCapability {
    /// Shadow data is readable
    Available,
    /// Shadow data is not readable (missing file, no privileges)
    Unavailable,
}

impl ShadowCapability {
    /// Check once whether the shadow file can be opened.
    pub fn probe(path: &Path) -> Self {
        match File::open(path) {
            Ok(_) => ShadowCapability::Available,
            Err(e) => {
                log::info!("shadow data unavailable ({}): {e}", path.display());
                ShadowCapability::Unavailable
            }
        }
    }

    /// Whether shadow reads will return data.
    pub fn is_available(&self) -> bool {
        matches!(self, ShadowCapability::Available)
    }
}

/// Reads password hashes and aging fields.
#[derive(Debug, Clone)]
pub struct ShadowAccessor {
    path: PathBuf,
    capability: ShadowCapability,
}

impl ShadowAccessor {
    /// Create an accessor with an already-decided capability.
    pub fn new(path: impl Into<PathBuf>, capability: ShadowCapability) -> Self {
        Self {
            path: path.into(),
            capability,
        }
    }

    /// Probe the host's shadow file and build an accessor for it.
    pub fn system() -> Self {
        let path = PathBuf::from(SHADOW_PATH);
        let capability = ShadowCapability::probe(&path);
        Self { path, capability }
    }

    /// An accessor that never returns data.
    pub fn unavailable() -> Self {
        Self::new(SHADOW_PATH, ShadowCapability::Unavailable)
    }

    /// The capability decided at construction.
    pub fn capability(&self) -> ShadowCapability {
        self.capability
    }

    /// The full shadow entry for an account.
    pub fn entry(&self, name: &str) -> Option<ShadowEntry> {
        self.entries()?.into_iter().find(|e| e.name == name)
    }

    /// Password hash for an account.
    pub fn password_hash(&self, name: &str) -> Option<String> {
        self.entry(name)?.password
    }

    /// Minimum password age for an account.
    pub fn min_age(&self, name: &str) -> Option<i64> {
        self.entry(name)?.min_age
    }

    /// Maximum password age for an account.
    pub fn max_age(&self, name: &str) -> Option<i64> {
        self.entry(name)?.max_age
    }

    /// Every shadow entry; empty when the capability is missing.
    pub fn read_all(&self) -> Vec<ShadowEntry> {
        self.entries().unwrap_or_default()
    }

    fn entries(&self) -> Option<Vec<ShadowEntry>> {
        if !self.capability.is_available() {
            return None;
        }
        // The file was readable at probe time; a failure now degrades to absent.
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) => {
                log::warn!("cannot read {}: {e}", self.path.display());
                return None;
            }
        };
        Some(
            BufReader::new(file)
                .lines()
                .map_while(std::result::Result::ok)
                .filter_map(|line| parse_shadow_line(&line))
                .collect(),
        )
    }
}

/// Parse one shadow database line.
///
/// Layout: `name:hash:lastchg:min:max:warn:inactive:expire:reserved`.
pub fn parse_shadow_line(line: &str) -> Option<ShadowEntry> {
    let fields: Vec<&str> = line.trim_end().split(':').collect();
    if fields.len() < 2 || fields[0].is_empty() {
        return None;
    }

    let number = |index: usize| fields.get(index).and_then(|f| f.trim().parse().ok());

    Some(ShadowEntry {
        name: fields[0].to_string(),
        password: Some(fields[1].to_string()),
        min_age: number(3),
        max_age: number(4),
        expiry: number(7),
    })
}
