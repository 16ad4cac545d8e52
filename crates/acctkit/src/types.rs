//! Core types for account reconciliation.
//!
//! Observed records ([`Account`], [`Group`], [`ShadowEntry`]) come from the
//! system databases. [`DesiredAccount`] is what the caller wants the host to
//! look like.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A user account as recorded in the account database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Login name (unique key)
    pub name: String,
    /// Numeric user id
    pub uid: u32,
    /// Numeric primary group id
    pub gid: u32,
    /// GECOS / comment field
    pub gecos: String,
    /// Home directory
    pub home: String,
    /// Login shell
    pub shell: String,
}

/// A group as recorded in the group database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Group name
    pub name: String,
    /// Numeric group id
    pub gid: u32,
    /// Supplementary members, in file order
    pub members: Vec<String>,
}

impl Group {
    /// Check whether an account is listed as a member.
    pub fn has_member(&self, account: &str) -> bool {
        self.members.iter().any(|m| m == account)
    }
}

/// Password and aging data from the shadow facility.
///
/// `None` means the field is absent, which is not the same as `Some(0)`
/// or an empty hash.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShadowEntry {
    /// Login name
    pub name: String,
    /// Password hash
    pub password: Option<String>,
    /// Minimum days between password changes
    pub min_age: Option<i64>,
    /// Maximum days a password stays valid
    pub max_age: Option<i64>,
    /// Account expiry, in days since 1970-01-01
    pub expiry: Option<i64>,
}

/// Whether an account should exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ensure {
    /// The account must exist
    #[default]
    Present,
    /// The account must not exist
    Absent,
}

impl fmt::Display for Ensure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ensure::Present => write!(f, "present"),
            Ensure::Absent => write!(f, "absent"),
        }
    }
}

/// How the desired group list relates to existing memberships.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Membership {
    /// Desired groups must be a subset of the current ones
    #[default]
    Minimum,
    /// Desired groups must be exactly the current ones
    Inclusive,
}

/// A value supplied by the caller before validation.
///
/// Config files may carry ids as numbers or as strings; both are kept as
/// given and only turned into integers by validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    /// A number
    Int(i64),
    /// Free text
    Text(String),
}

impl RawValue {
    /// The value as an integer, if it is one.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            RawValue::Int(n) => Some(*n),
            RawValue::Text(s) => s.trim().parse().ok(),
        }
    }

    /// The value as a command argument: the integer when it parses as
    /// one, otherwise the text as given.
    pub fn render(&self) -> String {
        self.as_integer()
            .map_or_else(|| self.to_string(), |n| n.to_string())
    }

    /// Whether the value renders as an empty string.
    pub fn is_empty(&self) -> bool {
        matches!(self, RawValue::Text(s) if s.is_empty())
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Int(n) => write!(f, "{n}"),
            RawValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RawValue {
    fn from(n: i64) -> Self {
        RawValue::Int(n)
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

/// Settable account properties, in canonical order.
///
/// The derived `Ord` follows declaration order, so a `BTreeSet<Property>`
/// iterates in the same order commands are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Property {
    /// Home directory
    Home,
    /// User id
    Uid,
    /// Primary group id
    Gid,
    /// GECOS comment
    Comment,
    /// Login shell
    Shell,
    /// Password hash
    Password,
    /// Minimum password age
    PasswordMinAge,
    /// Maximum password age
    PasswordMaxAge,
    /// Supplementary groups
    Groups,
    /// Expiry date
    Expiry,
}

impl Property {
    /// Every property in canonical order.
    pub const ALL: [Property; 10] = [
        Property::Home,
        Property::Uid,
        Property::Gid,
        Property::Comment,
        Property::Shell,
        Property::Password,
        Property::PasswordMinAge,
        Property::PasswordMaxAge,
        Property::Groups,
        Property::Expiry,
    ];

    /// Command-line flag for this property.
    pub fn flag(&self) -> &'static str {
        match self {
            Property::Home => "-d",
            Property::Uid => "-u",
            Property::Gid => "-g",
            Property::Comment => "-c",
            Property::Shell => "-s",
            Property::Password => "-p",
            Property::PasswordMinAge => "-m",
            Property::PasswordMaxAge => "-M",
            Property::Groups => "-G",
            Property::Expiry => "-e",
        }
    }

    /// Property name as used in config files.
    pub fn name(&self) -> &'static str {
        match self {
            Property::Home => "home",
            Property::Uid => "uid",
            Property::Gid => "gid",
            Property::Comment => "comment",
            Property::Shell => "shell",
            Property::Password => "password",
            Property::PasswordMinAge => "password_min_age",
            Property::PasswordMaxAge => "password_max_age",
            Property::Groups => "groups",
            Property::Expiry => "expiry",
        }
    }

    /// Password aging properties are set with the aging tool, not usermod.
    pub fn is_aging(&self) -> bool {
        matches!(self, Property::PasswordMinAge | Property::PasswordMaxAge)
    }

    /// Properties whose observed value lives in the shadow facility.
    pub fn is_shadow(&self) -> bool {
        matches!(
            self,
            Property::Password
                | Property::PasswordMinAge
                | Property::PasswordMaxAge
                | Property::Expiry
        )
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The state an account should be in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredAccount {
    /// Login name
    pub name: String,
    /// Whether the account should exist
    #[serde(default)]
    pub ensure: Ensure,
    /// User id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<RawValue>,
    /// Primary group id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gid: Option<RawValue>,
    /// GECOS comment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Home directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<String>,
    /// Login shell
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
    /// Pre-hashed password
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Supplementary groups, comma-separated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<String>,
    /// How `groups` relates to current memberships
    #[serde(default)]
    pub membership: Membership,
    /// Minimum password age in days
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_min_age: Option<RawValue>,
    /// Maximum password age in days
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_max_age: Option<RawValue>,
    /// Expiry date (`YYYY-MM-DD`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<String>,
    /// Allow a uid already used by another account
    #[serde(default)]
    pub allow_duplicate_uid: bool,
    /// Create the home directory on add, remove it on delete
    #[serde(default)]
    pub manage_home: bool,
    /// Create a system account
    #[serde(default)]
    pub system: bool,
}

impl DesiredAccount {
    /// A present account with no properties set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// An account that must not exist.
    pub fn absent(name: impl Into<String>) -> Self {
        Self {
            ensure: Ensure::Absent,
            ..Self::new(name)
        }
    }

    /// Set the comment.
    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }

    /// Set the supplementary group list.
    pub fn with_groups(mut self, groups: &str) -> Self {
        self.groups = Some(groups.to_string());
        self
    }

    /// Set the primary gid.
    pub fn with_gid(mut self, gid: impl Into<RawValue>) -> Self {
        self.gid = Some(gid.into());
        self
    }

    /// Set the home directory.
    pub fn with_home(mut self, home: &str) -> Self {
        self.home = Some(home.to_string());
        self
    }

    /// Set the maximum password age.
    pub fn with_max_age(mut self, days: impl Into<RawValue>) -> Self {
        self.password_max_age = Some(days.into());
        self
    }

    /// Set the minimum password age.
    pub fn with_min_age(mut self, days: impl Into<RawValue>) -> Self {
        self.password_min_age = Some(days.into());
        self
    }

    /// Whether the account should exist.
    pub fn is_present(&self) -> bool {
        self.ensure == Ensure::Present
    }

    /// The desired value of a property rendered as a command argument.
    ///
    /// Returns `None` when the property is not specified.
    pub fn value(&self, property: Property) -> Option<String> {
        match property {
            Property::Home => self.home.clone(),
            Property::Uid => self.uid.as_ref().map(RawValue::render),
            Property::Gid => self.gid.as_ref().map(RawValue::render),
            Property::Comment => self.comment.clone(),
            Property::Shell => self.shell.clone(),
            Property::Password => self.password.clone(),
            Property::PasswordMinAge => self.password_min_age.as_ref().map(RawValue::render),
            Property::PasswordMaxAge => self.password_max_age.as_ref().map(RawValue::render),
            Property::Groups => self.groups.clone(),
            Property::Expiry => self.expiry.clone(),
        }
    }

    /// Desired supplementary groups as a list.
    pub fn group_list(&self) -> Vec<String> {
        split_groups(self.groups.as_deref().unwrap_or(""))
    }
}

/// Split a comma-joined group list, dropping empty entries.
pub fn split_groups(groups: &str) -> Vec<String> {
    groups
        .split(',')
        .filter(|g| !g.is_empty())
        .map(str::to_string)
        .collect()
}
