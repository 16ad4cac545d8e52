//! Per-account action decisions.
//!
//! The reconciler compares a desired record with its cached instance,
//! picks one action and asks the [`Builder`] for the commands that carry
//! it out.

use crate::cache::{Instance, InstanceCache};
use crate::command::{Builder, CommandLine, days_since_epoch, parse_expiry, validate};
use crate::error::Result;
use crate::shadow::ShadowCapability;
use crate::types::{DesiredAccount, Ensure, Membership, Property, split_groups};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// What a pass does to one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Account is missing and must be created
    Create,
    /// Account exists with differing properties
    Modify,
    /// Account exists and must be removed
    Delete,
    /// Only password aging differs
    SetAging,
    /// Already converged
    None,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Action::Create => "create",
            Action::Modify => "modify",
            Action::Delete => "delete",
            Action::SetAging => "set-aging",
            Action::None => "none",
        };
        f.write_str(label)
    }
}

/// The decision for one account and the commands implementing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Account name
    pub name: String,
    /// Chosen action
    pub action: Action,
    /// Properties that differ (empty for create/delete)
    pub changed: BTreeSet<Property>,
    /// Commands to run, in order
    pub commands: Vec<CommandLine>,
}

impl Plan {
    fn new(name: &str, action: Action) -> Self {
        Self {
            name: name.to_string(),
            action,
            changed: BTreeSet::new(),
            commands: Vec::new(),
        }
    }

    /// Whether nothing needs to run.
    pub fn is_noop(&self) -> bool {
        self.action == Action::None
    }
}

/// Properties whose observed value differs from the desired one.
///
/// Only properties the desired record specifies are compared. Shadow-backed
/// properties are skipped when shadow data can't be read, since their
/// observed value is unknown rather than different.
pub fn changed_properties(
    desired: &DesiredAccount,
    instance: &Instance,
    shadow: ShadowCapability,
) -> Result<BTreeSet<Property>> {
    let mut changed = BTreeSet::new();

    for property in Property::ALL {
        let Some(wanted) = desired.value(property) else {
            continue;
        };
        // An empty expiry means "not managed", as on create
        if property == Property::Expiry && wanted.is_empty() {
            continue;
        }
        if property.is_shadow() && !shadow.is_available() {
            log::debug!("{}: cannot compare {property} without shadow data", desired.name);
            continue;
        }

        let differs = match property {
            Property::Uid => integer_differs(&wanted, instance.account.uid),
            Property::Gid => integer_differs(&wanted, instance.account.gid),
            Property::Groups => groups_differ(desired, instance),
            Property::Expiry => {
                let days = days_since_epoch(parse_expiry(&desired.name, &wanted)?);
                instance.shadow.as_ref().and_then(|s| s.expiry) != Some(days)
            }
            Property::PasswordMinAge | Property::PasswordMaxAge => {
                let observed = instance.value(property).and_then(|v| v.parse::<i64>().ok());
                observed != wanted.trim().parse::<i64>().ok()
            }
            _ => instance.value(property).as_deref() != Some(wanted.as_str()),
        };

        if differs {
            changed.insert(property);
        }
    }

    Ok(changed)
}

fn integer_differs(wanted: &str, observed: u32) -> bool {
    wanted.trim().parse::<i64>().ok() != Some(i64::from(observed))
}

fn groups_differ(desired: &DesiredAccount, instance: &Instance) -> bool {
    let wanted: BTreeSet<String> = desired.group_list().into_iter().collect();
    let current: BTreeSet<String> = instance.groups.iter().cloned().collect();
    match desired.membership {
        Membership::Minimum => !wanted.is_subset(&current),
        Membership::Inclusive => wanted != current,
    }
}

/// Under minimum membership, keep current groups and add the desired ones.
fn merged_groups(desired: &DesiredAccount, instance: &Instance) -> String {
    let mut groups = instance.groups.clone();
    for group in split_groups(desired.groups.as_deref().unwrap_or("")) {
        if !groups.contains(&group) {
            groups.push(group);
        }
    }
    groups.join(",")
}

/// Decides actions and renders their commands.
#[derive(Debug, Clone)]
pub struct Reconciler {
    builder: Builder,
    shadow: ShadowCapability,
}

impl Reconciler {
    /// Create a reconciler.
    pub fn new(builder: Builder, shadow: ShadowCapability) -> Self {
        Self { builder, shadow }
    }

    /// The command builder in use.
    pub fn builder(&self) -> &Builder {
        &self.builder
    }

    /// Decide what to do for one account given its observed instance.
    pub fn plan(&self, desired: &DesiredAccount, observed: Option<&Instance>) -> Result<Plan> {
        validate(desired)?;
        let name = desired.name.as_str();

        let plan = match (desired.ensure, observed) {
            (Ensure::Absent, None) => Plan::new(name, Action::None),
            (Ensure::Absent, Some(_)) => {
                let mut plan = Plan::new(name, Action::Delete);
                plan.commands.push(self.builder.build_delete(desired)?);
                plan
            }
            (Ensure::Present, None) => {
                let mut plan = Plan::new(name, Action::Create);
                plan.commands.push(self.builder.build_create(desired)?);
                plan.commands
                    .extend(self.builder.build_password_aging(desired)?);
                plan
            }
            (Ensure::Present, Some(instance)) => self.plan_existing(desired, instance)?,
        };

        log::info!("{name}: {}", plan.action);
        Ok(plan)
    }

    fn plan_existing(&self, desired: &DesiredAccount, instance: &Instance) -> Result<Plan> {
        let changed = changed_properties(desired, instance, self.shadow)?;
        let mut plan = Plan::new(&desired.name, Action::None);
        if changed.is_empty() {
            return Ok(plan);
        }

        let rendered = if changed.contains(&Property::Groups)
            && desired.membership == Membership::Minimum
        {
            DesiredAccount {
                groups: Some(merged_groups(desired, instance)),
                ..desired.clone()
            }
        } else {
            desired.clone()
        };

        if let Some(cmd) = self.builder.build_modify(&rendered, &changed)? {
            plan.action = Action::Modify;
            plan.commands.push(cmd);
        }
        if changed.iter().any(Property::is_aging)
            && let Some(cmd) = self.builder.build_password_aging(desired)?
        {
            if plan.action == Action::None {
                plan.action = Action::SetAging;
            }
            plan.commands.push(cmd);
        }

        plan.changed = changed;
        Ok(plan)
    }

    /// Plan a whole pass.
    ///
    /// The cache is loaded before any account is looked at; a read failure
    /// aborts the pass. Validation failures are returned per account.
    pub fn plan_all(
        &self,
        cache: &mut InstanceCache,
        desired: &[DesiredAccount],
    ) -> Result<Vec<(String, Result<Plan>)>> {
        cache.load()?;
        if cache.skipped() > 0 {
            log::warn!(
                "{} malformed lines skipped in account databases",
                cache.skipped()
            );
        }

        Ok(desired
            .iter()
            .map(|d| (d.name.clone(), self.plan(d, cache.get(&d.name))))
            .collect())
    }
}
