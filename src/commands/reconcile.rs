//! Declarative commands
//!
//! - `diff` - Preview what apply would change
//! - `apply` - Make the host's accounts match the config

use acctkit::Plan;
use anyhow::{Result, bail};
use serde::Serialize;

use crate::Context;
use crate::config::RosterConfig;
use crate::engine::{self, ExecuteOptions, differ, planner};
use crate::sudo;
use crate::ui;

/// One account in `diff --json` output
#[derive(Debug, Serialize)]
struct PlanReport<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    plan: Option<&'a Plan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn load(ctx: &Context) -> Result<RosterConfig> {
    let (config, path) = RosterConfig::load(ctx.config.as_deref())?;
    log::info!("config: {} ({} accounts)", path.display(), config.users.len());
    Ok(config)
}

/// Whether account commands have to go through sudo
fn needs_sudo(config: &RosterConfig) -> bool {
    config.sudo && !sudo::is_root()
}

fn warn_skipped(skipped: usize) {
    if skipped > 0 {
        ui::warn(&format!(
            "{skipped} malformed lines skipped in account databases"
        ));
    }
}

pub fn diff(ctx: &Context, target: Option<&str>, json: bool) -> Result<()> {
    let config = load(ctx)?;
    let mut pass = engine::open_pass(&config);

    if json {
        return print_json(&config, &mut pass, target);
    }

    ui::header("Account Diff");
    let plan = planner::build(&config, &mut pass, target, needs_sudo(&config))?;
    warn_skipped(plan.skipped_lines);

    let (diffs, failures) = differ::compute_diffs(&plan.resources);
    differ::display_diff(&diffs, &failures);

    Ok(())
}

fn print_json(
    config: &RosterConfig,
    pass: &mut acctkit::Pass,
    target: Option<&str>,
) -> Result<()> {
    let desired: Vec<_> = config
        .users
        .iter()
        .filter(|u| planner::matches_filter(&u.name, target))
        .cloned()
        .collect();
    let plans = pass.plan(&desired)?;

    let reports: Vec<PlanReport> = plans
        .iter()
        .map(|(name, plan)| match plan {
            Ok(plan) => PlanReport {
                name,
                plan: Some(plan),
                error: None,
            },
            Err(e) => PlanReport {
                name,
                plan: None,
                error: Some(e.to_string()),
            },
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&reports)?);
    Ok(())
}

pub fn apply(ctx: &Context, target: Option<&str>, dry_run: bool, yes: bool) -> Result<()> {
    if !ctx.quiet {
        ui::header("Applying Accounts");
    }

    let config = load(ctx)?;
    let mut pass = engine::open_pass(&config);
    let plan = planner::build(&config, &mut pass, target, needs_sudo(&config))?;
    warn_skipped(plan.skipped_lines);

    if plan.is_empty() {
        ui::info("No accounts in config");
        return Ok(());
    }

    let summary = engine::execute(
        &plan,
        &ExecuteOptions {
            dry_run,
            yes,
            verbose: ctx.verbose > 0,
        },
    )?;

    if !summary.is_success() {
        bail!("{} accounts failed", summary.failed);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use acctkit::{Action, CommandLine};
    use std::collections::BTreeSet;

    #[test]
    fn test_plan_report_json() {
        let plan = Plan {
            name: "bob".into(),
            action: Action::Modify,
            changed: BTreeSet::from([acctkit::Property::Comment]),
            commands: vec![CommandLine {
                program: "usermod".into(),
                args: vec!["-c".into(), "Bob S.".into(), "bob".into()],
            }],
        };
        let reports = [
            PlanReport {
                name: "bob",
                plan: Some(&plan),
                error: None,
            },
            PlanReport {
                name: "cat",
                plan: None,
                error: Some("invalid gid".into()),
            },
        ];

        let value = serde_json::to_value(reports).unwrap();
        assert_eq!(value[0]["plan"]["action"], "modify");
        assert_eq!(value[0]["plan"]["changed"][0], "comment");
        assert_eq!(value[0]["plan"]["commands"][0]["program"], "usermod");
        assert!(value[0].get("error").is_none());
        assert_eq!(value[1]["error"], "invalid gid");
    }
}
