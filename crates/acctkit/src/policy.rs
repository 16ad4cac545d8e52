//! Platform-dependent command-line modifiers.
//!
//! Each policy returns its own modifier list. The command builder appends
//! them in a fixed order: duplicate, home, expiry, system account.

use crate::platform::Platform;
use crate::types::DesiredAccount;
use serde::{Deserialize, Serialize};

/// Flag allowing a non-unique uid.
pub const ALLOW_DUPLICATE_FLAG: &str = "-o";
/// Flag creating the home directory.
pub const CREATE_HOME_FLAG: &str = "-m";
/// Flag suppressing home directory creation.
pub const NO_CREATE_HOME_FLAG: &str = "-M";
/// Flag setting the expiry date.
pub const EXPIRY_FLAG: &str = "-e";
/// Flag creating a system account.
pub const SYSTEM_FLAG: &str = "-r";

/// Compatibility switches for older framework behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compat {
    /// Legacy only: older framework releases expected the create command
    /// itself to carry the system-account flag. Newer ones create system
    /// accounts through their own path, so this is off by default.
    #[serde(default)]
    pub legacy_system_users: bool,
}

/// Resolves modifiers for a platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyResolver {
    platform: Platform,
    compat: Compat,
}

impl PolicyResolver {
    /// Create a resolver for a platform.
    pub fn new(platform: Platform, compat: Compat) -> Self {
        Self { platform, compat }
    }

    /// The platform this resolver applies.
    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Allow-duplicate-uid modifier.
    pub fn duplicate(&self, desired: &DesiredAccount) -> Vec<String> {
        if desired.allow_duplicate_uid {
            vec![ALLOW_DUPLICATE_FLAG.to_string()]
        } else {
            Vec::new()
        }
    }

    /// Home directory modifier.
    ///
    /// RedHat-family `useradd` creates homes by default, so an explicit
    /// negative is needed there when the home is unmanaged.
    pub fn home(&self, desired: &DesiredAccount) -> Vec<String> {
        if desired.manage_home {
            return vec![CREATE_HOME_FLAG.to_string()];
        }
        match self.platform {
            Platform::RedHat => vec![NO_CREATE_HOME_FLAG.to_string()],
            Platform::Debian | Platform::Solaris | Platform::HpUx | Platform::Other(_) => {
                Vec::new()
            }
        }
    }

    /// Expiry modifier.
    pub fn expiry(&self, desired: &DesiredAccount) -> Vec<String> {
        match desired.expiry.as_deref() {
            Some(date) if !date.is_empty() => vec![EXPIRY_FLAG.to_string(), date.to_string()],
            _ => Vec::new(),
        }
    }

    /// System-account modifier, only under [`Compat::legacy_system_users`].
    pub fn system_account(&self, desired: &DesiredAccount) -> Vec<String> {
        if !self.compat.legacy_system_users {
            return Vec::new();
        }
        if self.platform.supports_system_users() && desired.system {
            vec![SYSTEM_FLAG.to_string()]
        } else {
            Vec::new()
        }
    }

    /// All create-time modifiers in order.
    pub fn create_modifiers(&self, desired: &DesiredAccount) -> Vec<String> {
        let mut modifiers = self.duplicate(desired);
        modifiers.extend(self.home(desired));
        modifiers.extend(self.expiry(desired));
        modifiers.extend(self.system_account(desired));
        modifiers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(identity: &str) -> PolicyResolver {
        PolicyResolver::new(Platform::from_identity(identity), Compat::default())
    }

    #[test]
    fn test_home_policy_per_platform() {
        let desired = DesiredAccount::new("bob");
        assert_eq!(resolver("CentOS").home(&desired), vec!["-M"]);
        assert!(resolver("Debian").home(&desired).is_empty());
        assert!(resolver("Gentoo").home(&desired).is_empty());
    }

    #[test]
    fn test_managed_home_wins_everywhere() {
        let desired = DesiredAccount {
            manage_home: true,
            ..DesiredAccount::new("bob")
        };
        assert_eq!(resolver("CentOS").home(&desired), vec!["-m"]);
        assert_eq!(resolver("Debian").home(&desired), vec!["-m"]);
    }

    #[test]
    fn test_duplicate_policy() {
        let resolver = resolver("Debian");
        assert!(resolver.duplicate(&DesiredAccount::new("bob")).is_empty());
        let dup = DesiredAccount {
            allow_duplicate_uid: true,
            ..DesiredAccount::new("bob")
        };
        assert_eq!(resolver.duplicate(&dup), vec!["-o"]);
    }

    #[test]
    fn test_expiry_policy() {
        let desired = DesiredAccount {
            expiry: Some("2030-01-01".into()),
            ..DesiredAccount::new("bob")
        };
        assert_eq!(resolver("Debian").expiry(&desired), vec!["-e", "2030-01-01"]);
        assert!(resolver("Debian").expiry(&DesiredAccount::new("bob")).is_empty());
    }

    #[test]
    fn test_system_policy_is_gated_by_compat() {
        let desired = DesiredAccount {
            system: true,
            ..DesiredAccount::new("svc")
        };
        assert!(resolver("Debian").system_account(&desired).is_empty());

        let legacy = Compat {
            legacy_system_users: true,
        };
        let debian = PolicyResolver::new(Platform::Debian, legacy);
        assert_eq!(debian.system_account(&desired), vec!["-r"]);

        let solaris = PolicyResolver::new(Platform::Solaris, legacy);
        assert!(solaris.system_account(&desired).is_empty());

        assert!(debian.system_account(&DesiredAccount::new("bob")).is_empty());
    }

    #[test]
    fn test_create_modifier_order() {
        let desired = DesiredAccount {
            allow_duplicate_uid: true,
            expiry: Some("2030-01-01".into()),
            system: true,
            ..DesiredAccount::new("svc")
        };
        let resolver = PolicyResolver::new(
            Platform::RedHat,
            Compat {
                legacy_system_users: true,
            },
        );
        assert_eq!(
            resolver.create_modifiers(&desired),
            vec!["-o", "-M", "-e", "2030-01-01", "-r"]
        );
    }
}
