//! Command-line construction for the account tools.
//!
//! The builder only renders: it never diffs and never runs anything.
//! Values are passed through verbatim; quoting is up to whoever executes
//! the resulting [`CommandLine`].

use crate::error::{Error, Result};
use crate::policy::PolicyResolver;
use crate::types::{DesiredAccount, Property, RawValue};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Flag removing the home directory on delete.
pub const REMOVE_HOME_FLAG: &str = "-r";

/// Format accepted for expiry dates.
pub const EXPIRY_FORMAT: &str = "%Y-%m-%d";

/// Names of the account-management tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandSet {
    /// Create command
    pub add: String,
    /// Modify command
    pub modify: String,
    /// Delete command
    pub delete: String,
    /// Password aging command
    pub password: String,
}

impl Default for CommandSet {
    fn default() -> Self {
        Self {
            add: "useradd".to_string(),
            modify: "usermod".to_string(),
            delete: "userdel".to_string(),
            password: "chage".to_string(),
        }
    }
}

/// A program plus its ordered arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandLine {
    /// Program to run
    pub program: String,
    /// Arguments, in order
    pub args: Vec<String>,
}

impl CommandLine {
    fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
        }
    }

    fn push(&mut self, arg: impl Into<String>) {
        self.args.push(arg.into());
    }

    /// Program followed by its arguments.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{arg}'")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Check a desired record against the builder preconditions.
pub fn validate(desired: &DesiredAccount) -> Result<()> {
    let name = desired.name.as_str();
    if name.is_empty() || name.contains(':') || name.contains(char::is_whitespace) {
        return Err(Error::validation(
            name,
            "name",
            "must be non-empty without ':' or whitespace",
        ));
    }

    let integer = |field: &'static str, value: &Option<RawValue>| match value {
        Some(v) if v.as_integer().is_none() => Err(Error::validation(
            name,
            field,
            format!("'{v}' is not an integer"),
        )),
        _ => Ok(()),
    };
    integer("gid", &desired.gid)?;
    integer("uid", &desired.uid)?;
    integer("password_min_age", &desired.password_min_age)?;
    integer("password_max_age", &desired.password_max_age)?;

    if let Some(groups) = &desired.groups
        && groups.contains(char::is_whitespace)
    {
        return Err(Error::validation(
            name,
            "groups",
            "must be comma-separated without whitespace",
        ));
    }

    if let Some(expiry) = desired.expiry.as_deref()
        && !expiry.is_empty()
    {
        parse_expiry(name, expiry)?;
    }

    Ok(())
}

/// Parse an expiry date.
pub fn parse_expiry(name: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, EXPIRY_FORMAT).map_err(|_| Error::InvalidDate {
        name: name.to_string(),
        value: value.to_string(),
    })
}

fn epoch() -> NaiveDate {
    NaiveDate::default()
}

/// Convert a shadow day count to a date.
pub fn date_from_days(days: i64) -> Option<NaiveDate> {
    epoch().checked_add_signed(chrono::Duration::try_days(days)?)
}

/// Convert a date to a shadow day count.
pub fn days_since_epoch(date: NaiveDate) -> i64 {
    (date - epoch()).num_days()
}

/// Builds create, modify, delete and password-aging invocations.
#[derive(Debug, Clone)]
pub struct Builder {
    commands: CommandSet,
    policy: PolicyResolver,
}

impl Builder {
    /// Create a builder.
    pub fn new(commands: CommandSet, policy: PolicyResolver) -> Self {
        Self { commands, policy }
    }

    /// The policy applied to create commands.
    pub fn policy(&self) -> &PolicyResolver {
        &self.policy
    }

    /// Create command: properties, modifiers, then the name.
    ///
    /// Password ages are left to [`Builder::build_password_aging`] and the
    /// expiry to the expiry policy.
    pub fn build_create(&self, desired: &DesiredAccount) -> Result<CommandLine> {
        validate(desired)?;
        let mut cmd = CommandLine::new(&self.commands.add);

        for property in Property::ALL {
            if property.is_aging() || property == Property::Expiry {
                continue;
            }
            if let Some(value) = desired.value(property)
                && !value.is_empty()
            {
                cmd.push(property.flag());
                cmd.push(value);
            }
        }

        cmd.args.extend(self.policy.create_modifiers(desired));
        cmd.push(&desired.name);
        Ok(cmd)
    }

    /// Delete command.
    pub fn build_delete(&self, desired: &DesiredAccount) -> Result<CommandLine> {
        validate(desired)?;
        let mut cmd = CommandLine::new(&self.commands.delete);
        if desired.manage_home {
            cmd.push(REMOVE_HOME_FLAG);
        }
        cmd.push(&desired.name);
        Ok(cmd)
    }

    /// Modify command for the given changed properties.
    ///
    /// Aging properties are skipped. Returns `None` when nothing is left to
    /// render, so no command gets issued.
    pub fn build_modify(
        &self,
        desired: &DesiredAccount,
        changed: &BTreeSet<Property>,
    ) -> Result<Option<CommandLine>> {
        validate(desired)?;
        let mut cmd = CommandLine::new(&self.commands.modify);

        for property in changed.iter().filter(|p| !p.is_aging()) {
            let value = desired.value(*property).unwrap_or_default();
            cmd.push(property.flag());
            cmd.push(value);
        }
        if changed.contains(&Property::Uid) {
            for arg in self.policy.duplicate(desired) {
                cmd.push(arg);
            }
        }

        if cmd.args.is_empty() {
            return Ok(None);
        }
        cmd.push(&desired.name);
        Ok(Some(cmd))
    }

    /// Password aging command, or `None` when no age is specified.
    pub fn build_password_aging(&self, desired: &DesiredAccount) -> Result<Option<CommandLine>> {
        validate(desired)?;
        let limits: Vec<(Property, String)> = [Property::PasswordMinAge, Property::PasswordMaxAge]
            .into_iter()
            .filter_map(|p| desired.value(p).map(|v| (p, v)))
            .collect();

        if limits.is_empty() {
            return Ok(None);
        }

        let mut cmd = CommandLine::new(&self.commands.password);
        for (property, value) in limits {
            cmd.push(property.flag());
            cmd.push(value);
        }
        cmd.push(&desired.name);
        Ok(Some(cmd))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Platform;
    use crate::policy::Compat;

    fn builder(platform: Platform) -> Builder {
        Builder::new(
            CommandSet::default(),
            PolicyResolver::new(platform, Compat::default()),
        )
    }

    fn argv(cmd: &CommandLine) -> Vec<&str> {
        std::iter::once(cmd.program.as_str())
            .chain(cmd.args.iter().map(String::as_str))
            .collect()
    }

    #[test]
    fn test_validate_gid_must_be_integer() {
        let err = validate(&DesiredAccount::new("bob").with_gid("notanumber")).unwrap_err();
        assert_eq!(err.field(), Some("gid"));
        assert!(validate(&DesiredAccount::new("bob").with_gid("1001")).is_ok());
    }

    #[test]
    fn test_validate_groups_whitespace() {
        let err = validate(&DesiredAccount::new("bob").with_groups("g1, g2")).unwrap_err();
        assert_eq!(err.field(), Some("groups"));
        assert!(validate(&DesiredAccount::new("bob").with_groups("g1,g2")).is_ok());
    }

    #[test]
    fn test_validate_name_and_expiry() {
        assert!(validate(&DesiredAccount::new("")).is_err());
        assert!(validate(&DesiredAccount::new("bad:name")).is_err());
        let bad_date = DesiredAccount {
            expiry: Some("next tuesday".into()),
            ..DesiredAccount::new("bob")
        };
        assert!(matches!(
            validate(&bad_date),
            Err(Error::InvalidDate { .. })
        ));
    }

    #[test]
    fn test_day_count_conversion() {
        let date = parse_expiry("bob", "2024-10-30").unwrap();
        let days = days_since_epoch(date);
        assert_eq!(days, 20026);
        assert_eq!(date_from_days(days), Some(date));
        assert_eq!(date_from_days(0), NaiveDate::from_ymd_opt(1970, 1, 1));
    }

    #[test]
    fn test_build_create_canonical_order() {
        let desired = DesiredAccount {
            shell: Some("/bin/zsh".into()),
            uid: Some(RawValue::Int(1001)),
            comment: Some("Bob Smith".into()),
            home: Some("/home/bob".into()),
            groups: Some("wheel,dev".into()),
            password_max_age: Some(RawValue::Int(90)),
            ..DesiredAccount::new("bob")
        };
        let cmd = builder(Platform::Debian).build_create(&desired).unwrap();
        assert_eq!(
            argv(&cmd),
            vec![
                "useradd",
                "-d",
                "/home/bob",
                "-u",
                "1001",
                "-c",
                "Bob Smith",
                "-s",
                "/bin/zsh",
                "-G",
                "wheel,dev",
                "bob"
            ]
        );
    }

    #[test]
    fn test_build_create_skips_empty_values_and_appends_policy() {
        let desired = DesiredAccount {
            comment: Some(String::new()),
            allow_duplicate_uid: true,
            expiry: Some("2030-01-01".into()),
            ..DesiredAccount::new("bob")
        };
        let cmd = builder(Platform::RedHat).build_create(&desired).unwrap();
        assert_eq!(
            argv(&cmd),
            vec!["useradd", "-o", "-M", "-e", "2030-01-01", "bob"]
        );
    }

    #[test]
    fn test_build_create_rejects_invalid_record() {
        let desired = DesiredAccount::new("bob").with_gid("notanumber");
        assert!(builder(Platform::Debian).build_create(&desired).is_err());
    }

    #[test]
    fn test_build_delete() {
        let b = builder(Platform::Debian);
        let cmd = b.build_delete(&DesiredAccount::absent("bob")).unwrap();
        assert_eq!(argv(&cmd), vec!["userdel", "bob"]);

        let managed = DesiredAccount {
            manage_home: true,
            ..DesiredAccount::absent("bob")
        };
        let cmd = b.build_delete(&managed).unwrap();
        assert_eq!(argv(&cmd), vec!["userdel", "-r", "bob"]);
    }

    #[test]
    fn test_build_modify_renders_only_changed() {
        let desired = DesiredAccount::new("bob")
            .with_comment("Bob S.")
            .with_home("/srv/bob")
            .with_groups("g1,g2");
        let changed = BTreeSet::from([Property::Groups, Property::Comment]);
        let cmd = builder(Platform::Debian)
            .build_modify(&desired, &changed)
            .unwrap()
            .unwrap();
        assert_eq!(
            argv(&cmd),
            vec!["usermod", "-c", "Bob S.", "-G", "g1,g2", "bob"]
        );
    }

    #[test]
    fn test_build_modify_duplicate_flag_follows_uid_change() {
        let desired = DesiredAccount {
            uid: Some(RawValue::Int(0)),
            allow_duplicate_uid: true,
            ..DesiredAccount::new("bob").with_comment("Bob S.")
        };
        let b = builder(Platform::Debian);

        let uid_change = BTreeSet::from([Property::Uid]);
        let cmd = b.build_modify(&desired, &uid_change).unwrap().unwrap();
        assert_eq!(argv(&cmd), vec!["usermod", "-u", "0", "-o", "bob"]);

        let comment_change = BTreeSet::from([Property::Comment]);
        let cmd = b.build_modify(&desired, &comment_change).unwrap().unwrap();
        assert_eq!(argv(&cmd), vec!["usermod", "-c", "Bob S.", "bob"]);
    }

    #[test]
    fn test_padded_ids_render_as_integers() {
        let desired = DesiredAccount::new("bob").with_gid(" 1001");
        let cmd = builder(Platform::Debian).build_create(&desired).unwrap();
        assert_eq!(argv(&cmd), vec!["useradd", "-g", "1001", "bob"]);
    }

    #[test]
    fn test_build_modify_empty_set_issues_nothing() {
        let desired = DesiredAccount::new("bob").with_max_age(90);
        let b = builder(Platform::Debian);
        assert!(b.build_modify(&desired, &BTreeSet::new()).unwrap().is_none());
        let aging_only = BTreeSet::from([Property::PasswordMaxAge]);
        assert!(b.build_modify(&desired, &aging_only).unwrap().is_none());
    }

    #[test]
    fn test_password_aging_omitted_without_ages() {
        let b = builder(Platform::Debian);
        assert!(
            b.build_password_aging(&DesiredAccount::new("bob"))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_password_aging_only_max_age() {
        let b = builder(Platform::Debian);
        let cmd = b
            .build_password_aging(&DesiredAccount::new("bob").with_max_age(90))
            .unwrap()
            .unwrap();
        assert_eq!(argv(&cmd), vec!["chage", "-M", "90", "bob"]);
    }

    #[test]
    fn test_password_aging_both_ages() {
        let b = builder(Platform::Debian);
        let desired = DesiredAccount::new("bob").with_max_age(90).with_min_age(1);
        let cmd = b.build_password_aging(&desired).unwrap().unwrap();
        assert_eq!(argv(&cmd), vec!["chage", "-m", "1", "-M", "90", "bob"]);
    }

    #[test]
    fn test_command_line_display_quotes_spaces() {
        let desired = DesiredAccount::new("bob").with_comment("Bob S.");
        let changed = BTreeSet::from([Property::Comment]);
        let cmd = builder(Platform::Debian)
            .build_modify(&desired, &changed)
            .unwrap()
            .unwrap();
        assert_eq!(cmd.to_string(), "usermod -c 'Bob S.' bob");
        assert_eq!(cmd.argv()[0], "usermod");
    }
}
