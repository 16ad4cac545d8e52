//! User account resource - bridges a desired account to the reconciler

use acctkit::{Action, DesiredAccount, Ensure, Instance, Plan, Prefetch, Property, Reconciler};
use anyhow::{Result, anyhow, bail};

use super::{ApplyContext, ApplyResult, Resource, ResourceState, SudoRequirement};

/// A local user account managed through useradd/usermod/userdel/chage
#[derive(Debug, Clone)]
pub struct UserResource {
    desired: DesiredAccount,
    observed: Option<Instance>,
    plan: Option<Result<Plan, String>>,
    privileged: bool,
}

impl UserResource {
    pub fn new(desired: DesiredAccount) -> Self {
        Self {
            desired,
            observed: None,
            plan: None,
            privileged: false,
        }
    }

    /// Mark the resource as needing sudo to run its commands
    pub fn with_sudo(mut self, privileged: bool) -> Self {
        self.privileged = privileged;
        self
    }

    pub fn name(&self) -> &str {
        &self.desired.name
    }

    /// Decide the action against the prefetched instance.
    ///
    /// Validation failures are kept on the resource so siblings still run.
    pub fn decide(&mut self, reconciler: &Reconciler) {
        let plan = reconciler
            .plan(&self.desired, self.observed.as_ref())
            .map_err(|e| e.to_string());
        if let Err(e) = &plan {
            log::warn!("{}: {}", self.desired.name, e);
        }
        self.plan = Some(plan);
    }

    /// The decided plan, or why there isn't one
    pub fn plan(&self) -> Result<&Plan> {
        match &self.plan {
            Some(Ok(plan)) => Ok(plan),
            Some(Err(e)) => Err(anyhow!("{e}")),
            None => bail!("{}: no plan decided yet", self.desired.name),
        }
    }

    fn describe_observed(&self, instance: &Instance, properties: &[Property]) -> String {
        describe(properties, |p| instance.value(p))
    }

    fn describe_desired(&self, properties: &[Property]) -> String {
        describe(properties, |p| self.desired.value(p))
    }
}

fn describe(properties: &[Property], value: impl Fn(Property) -> Option<String>) -> String {
    properties
        .iter()
        .map(|p| {
            let shown = match (p, value(*p)) {
                (_, None) => "-".to_string(),
                (Property::Password, Some(_)) => "<hash>".to_string(),
                (_, Some(v)) => v,
            };
            format!("{p}={shown}")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn summary(uid: &str, home: &str) -> String {
    format!("uid {uid}, {home}")
}

impl Prefetch for UserResource {
    fn prefetch(&mut self, instance: &Instance) {
        self.observed = Some(instance.clone());
    }
}

impl Resource for UserResource {
    fn id(&self) -> String {
        format!("user:{}", self.desired.name)
    }

    fn description(&self) -> String {
        match self.desired.ensure {
            Ensure::Present => format!("Account {}", self.desired.name),
            Ensure::Absent => format!("Remove account {}", self.desired.name),
        }
    }

    fn resource_type(&self) -> &'static str {
        "user"
    }

    fn sudo_requirement(&self) -> SudoRequirement {
        if self.privileged {
            SudoRequirement::Required {
                reason: format!("manage account {}", self.desired.name),
            }
        } else {
            SudoRequirement::None
        }
    }

    fn current_state(&self) -> Result<ResourceState> {
        let plan = self.plan()?;
        let Some(instance) = &self.observed else {
            return Ok(ResourceState::Absent);
        };

        Ok(match plan.action {
            Action::Modify | Action::SetAging => {
                let changed: Vec<Property> = plan.changed.iter().copied().collect();
                ResourceState::Modified {
                    from: self.describe_observed(instance, &changed),
                    to: self.describe_desired(&changed),
                }
            }
            _ => ResourceState::Present {
                details: Some(summary(
                    &instance.account.uid.to_string(),
                    &instance.account.home,
                )),
            },
        })
    }

    fn desired_state(&self) -> ResourceState {
        match self.desired.ensure {
            Ensure::Absent => ResourceState::Absent,
            Ensure::Present => ResourceState::Present {
                details: self.desired.value(Property::Home).map(|home| {
                    summary(
                        &self.desired.value(Property::Uid).unwrap_or_else(|| "auto".into()),
                        &home,
                    )
                }),
            },
        }
    }

    fn needs_apply(&self) -> Result<bool> {
        Ok(!self.plan()?.is_noop())
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        let plan = match self.plan() {
            Ok(plan) => plan,
            Err(e) => {
                return Ok(ApplyResult::Failed {
                    error: e.to_string(),
                });
            }
        };

        if plan.is_noop() {
            return Ok(ApplyResult::NoChange);
        }

        if ctx.dry_run {
            for cmd in &plan.commands {
                println!("    would run: {cmd}");
            }
            return Ok(ApplyResult::Skipped {
                reason: "Dry run".to_string(),
            });
        }

        for cmd in &plan.commands {
            if ctx.verbose {
                println!("    $ {cmd}");
            }
            let output = ctx.runner.run(&cmd.program, &cmd.args)?;
            if !output.success {
                return Ok(ApplyResult::Failed {
                    error: format!("{} failed: {}", cmd.program, output.stderr_str().trim()),
                });
            }
        }

        Ok(match plan.action {
            Action::Create => ApplyResult::Created,
            Action::Delete => ApplyResult::Removed,
            Action::Modify | Action::SetAging => ApplyResult::Modified,
            Action::None => ApplyResult::NoChange,
        })
    }
}
