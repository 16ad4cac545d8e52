//! Execution planner - turns the config into decided resources

use acctkit::{Directory, Pass, ShadowAccessor, ShadowCapability};
use anyhow::{Context, Result};
use std::collections::BTreeMap;

use crate::config::RosterConfig;
use crate::resource::{Resource, SudoRequirement, UserResource};

/// Decided resources for one pass, in config order
#[derive(Debug, Default)]
pub struct ExecutionPlan {
    pub resources: Vec<Box<dyn Resource>>,
    /// Malformed database lines skipped while loading the snapshot
    pub skipped_lines: usize,
}

impl ExecutionPlan {
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn requires_sudo(&self) -> bool {
        self.resources
            .iter()
            .any(|r| matches!(r.sudo_requirement(), SudoRequirement::Required { .. }))
    }
}

/// Open a pass over the databases the config points at
pub fn open_pass(config: &RosterConfig) -> Pass {
    let shadow_path = config.paths.shadow_path();
    let capability = ShadowCapability::probe(&shadow_path);
    log::debug!("shadow at {}: {:?}", shadow_path.display(), capability);

    Pass::new(
        Directory::new(config.paths.passwd_path(), config.paths.group_path()),
        ShadowAccessor::new(shadow_path, capability),
        config.platform(),
        config.compat(),
        config.commands.clone(),
    )
}

/// Check if an account name matches the filter
pub fn matches_filter(name: &str, filter: Option<&str>) -> bool {
    filter.is_none_or(|f| name.contains(f))
}

/// Build the plan: load the snapshot once, bind every resource, decide.
///
/// A database read failure aborts the whole pass.
pub fn build(
    config: &RosterConfig,
    pass: &mut Pass,
    filter: Option<&str>,
    privileged: bool,
) -> Result<ExecutionPlan> {
    pass.cache_mut()
        .load()
        .context("Failed to read account databases")?;

    let mut by_name: BTreeMap<String, UserResource> = config
        .users
        .iter()
        .filter(|u| matches_filter(&u.name, filter))
        .map(|u| {
            (
                u.name.clone(),
                UserResource::new(u.clone()).with_sudo(privileged),
            )
        })
        .collect();

    let bound = pass.cache().bind(&mut by_name)?;
    log::debug!("{bound} of {} accounts exist", by_name.len());

    let mut plan = ExecutionPlan {
        skipped_lines: pass.cache().skipped(),
        ..Default::default()
    };
    for user in &config.users {
        if let Some(mut resource) = by_name.remove(&user.name) {
            resource.decide(pass.reconciler());
            plan.resources.push(Box::new(resource));
        }
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFormat;
    use std::fs;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir, users: &str) -> RosterConfig {
        let toml = format!(
            "platform = \"Debian\"\n[paths]\npasswd = \"{}\"\ngroup = \"{}\"\nshadow = \"{}\"\n{users}",
            dir.path().join("passwd").display(),
            dir.path().join("group").display(),
            dir.path().join("shadow").display(),
        );
        RosterConfig::parse(&toml, ConfigFormat::Toml).unwrap()
    }

    #[test]
    fn test_build_keeps_config_order() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("passwd"),
            "zed:x:1002:1002::/home/zed:/bin/sh\nbroken line\nbob:x:1001:1001::/home/bob:/bin/sh\n",
        )
        .unwrap();
        fs::write(dir.path().join("group"), "").unwrap();

        let config = config_in(
            &dir,
            "[[users]]\nname = \"zed\"\ncomment = \"Zed\"\n[[users]]\nname = \"amy\"\n[[users]]\nname = \"bob\"\n",
        );
        let mut pass = open_pass(&config);
        let plan = build(&config, &mut pass, None, false).unwrap();

        let ids: Vec<String> = plan.resources.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["user:zed", "user:amy", "user:bob"]);
        assert_eq!(plan.skipped_lines, 1);
        assert!(plan.resources[0].needs_apply().unwrap());
        assert!(plan.resources[1].needs_apply().unwrap());
        assert!(!plan.resources[2].needs_apply().unwrap());
        assert!(!plan.requires_sudo());
    }

    #[test]
    fn test_build_filters_and_marks_sudo() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("passwd"), "").unwrap();
        fs::write(dir.path().join("group"), "").unwrap();

        let config = config_in(&dir, "[[users]]\nname = \"amy\"\n[[users]]\nname = \"bob\"\n");
        let mut pass = open_pass(&config);
        let plan = build(&config, &mut pass, Some("bo"), true).unwrap();
        assert_eq!(plan.resources.len(), 1);
        assert!(plan.requires_sudo());
    }

    #[test]
    fn test_missing_database_aborts() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir, "[[users]]\nname = \"amy\"\n");
        let mut pass = open_pass(&config);
        let err = build(&config, &mut pass, None, false).unwrap_err();
        assert!(format!("{err:#}").contains("passwd"));
    }
}
