//! Execution engine - sequential executor with UI integration

use anyhow::Result;
use colored::Colorize;

use crate::resource::{ApplyContext, ApplyResult, Resource};
use crate::runner::{CommandRunner, Direct};
use crate::sudo::SudoContext;

use super::differ::{compute_diffs, display_diff, display_sudo_boundary};
use super::planner::ExecutionPlan;

/// Options for execution
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would run
    pub dry_run: bool,
    /// Skip confirmation prompts
    pub yes: bool,
    /// Echo each command before running it
    pub verbose: bool,
}

/// Summary of execution results
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ExecuteSummary {
    pub created: usize,
    pub modified: usize,
    pub removed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub no_change: usize,
}

impl ExecuteSummary {
    pub fn total_changes(&self) -> usize {
        self.created + self.modified + self.removed
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    fn record(&mut self, result: &ApplyResult) {
        match result {
            ApplyResult::NoChange => self.no_change += 1,
            ApplyResult::Created => self.created += 1,
            ApplyResult::Modified => self.modified += 1,
            ApplyResult::Removed => self.removed += 1,
            ApplyResult::Failed { .. } => self.failed += 1,
            ApplyResult::Skipped { .. } => self.skipped += 1,
        }
    }
}

/// Execute the plan with roster's UI integration
pub fn execute(plan: &ExecutionPlan, opts: &ExecuteOptions) -> Result<ExecuteSummary> {
    // 1. Compute and display what will change
    let (diffs, failures) = compute_diffs(&plan.resources);
    display_diff(&diffs, &failures);

    if diffs.is_empty() {
        let summary = ExecuteSummary {
            failed: failures.len(),
            no_change: plan.resources.len() - failures.len(),
            ..Default::default()
        };
        if !failures.is_empty() {
            print_summary(&summary);
        }
        return Ok(summary);
    }

    // 2. Dry run prints the commands each resource would run
    if opts.dry_run {
        println!();
        println!("  {} Dry run - no changes made", "ℹ".blue());
        let summary = run_sequential(&plan.resources, &Direct, true, opts.verbose);
        return Ok(summary);
    }

    // 3. Confirm (unless --yes)
    if !opts.yes && !confirm_proceed()? {
        println!();
        println!("  {} Aborted", "✗".red());
        return Ok(ExecuteSummary {
            skipped: diffs.len(),
            ..Default::default()
        });
    }

    // 4. Acquire sudo ONCE if any resource needs it
    let summary = if plan.requires_sudo() {
        let privileged: Vec<_> = diffs.iter().filter(|d| d.requires_sudo()).cloned().collect();
        display_sudo_boundary(&privileged);
        let sudo = SudoContext::acquire("Manage local user accounts")?;
        run_sequential(&plan.resources, &sudo, false, opts.verbose)
        // sudo dropped here automatically
    } else {
        run_sequential(&plan.resources, &Direct, false, opts.verbose)
    };

    // 5. Summary
    print_summary(&summary);

    Ok(summary)
}

/// Apply resources one at a time, in order
///
/// A failing resource doesn't stop the ones after it.
fn run_sequential(
    resources: &[Box<dyn Resource>],
    runner: &dyn CommandRunner,
    dry_run: bool,
    verbose: bool,
) -> ExecuteSummary {
    let mut summary = ExecuteSummary::default();
    let mut ctx = ApplyContext {
        dry_run,
        verbose,
        runner,
    };

    for resource in resources {
        let result = resource
            .apply(&mut ctx)
            .unwrap_or_else(|e| ApplyResult::Failed {
                error: format!("{e:#}"),
            });

        match &result {
            ApplyResult::NoChange => {}
            ApplyResult::Created | ApplyResult::Modified | ApplyResult::Removed => {
                println!("  {} {}", "✓".green(), resource.id());
            }
            ApplyResult::Failed { error } => {
                println!("  {} {} {}", "✗".red(), resource.id(), error.dimmed());
            }
            ApplyResult::Skipped { reason } => {
                log::debug!("{}: skipped ({reason})", resource.id());
            }
        }

        summary.record(&result);
    }

    summary
}

/// Confirm with user
fn confirm_proceed() -> Result<bool> {
    use dialoguer::Confirm;

    let confirmed = Confirm::new()
        .with_prompt("Continue?")
        .default(true)
        .interact()?;

    Ok(confirmed)
}

/// Print final summary
fn print_summary(summary: &ExecuteSummary) {
    println!();
    if summary.is_success() && summary.total_changes() == 0 {
        println!("  {} Nothing changed", "○".dimmed());
    } else if summary.is_success() {
        println!("  {} Accounts reconciled successfully!", "✓".green().bold());
    } else {
        println!("  {} Accounts reconciled with errors", "⚠".yellow().bold());
    }

    if summary.created > 0 {
        println!("    • {} accounts created", summary.created);
    }
    if summary.modified > 0 {
        println!("    • {} accounts modified", summary.modified);
    }
    if summary.removed > 0 {
        println!("    • {} accounts removed", summary.removed);
    }
    if summary.skipped > 0 {
        println!("    • {} accounts skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "accounts".red());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::UserResource;
    use crate::runner::CommandOutput;
    use acctkit::{
        Builder, CommandSet, Compat, DesiredAccount, Instance, Platform, PolicyResolver, Prefetch,
        Reconciler, ShadowCapability, directory::parse_passwd_line,
    };
    use std::cell::Cell;

    /// Succeeds for every program except `usermod`
    struct FailingUsermod {
        runs: Cell<usize>,
    }

    impl CommandRunner for FailingUsermod {
        fn run(&self, program: &str, _args: &[String]) -> Result<CommandOutput> {
            self.runs.set(self.runs.get() + 1);
            Ok(CommandOutput {
                stdout: Vec::new(),
                stderr: b"usermod: failed\n".to_vec(),
                success: program != "usermod",
            })
        }
    }

    fn resources() -> Vec<Box<dyn Resource>> {
        let reconciler = Reconciler::new(
            Builder::new(
                CommandSet::default(),
                PolicyResolver::new(Platform::Debian, Compat::default()),
            ),
            ShadowCapability::Unavailable,
        );
        let bob = Instance {
            account: parse_passwd_line("bob:x:1001:1001::/home/bob:/bin/sh").unwrap(),
            groups: Vec::new(),
            shadow: None,
        };

        let desired = [
            DesiredAccount::new("bob").with_comment("Bob"),
            DesiredAccount::new("amy"),
            DesiredAccount::new("cat").with_gid("x"),
            DesiredAccount::absent("dan"),
        ];
        desired
            .into_iter()
            .map(|d| {
                let mut r = UserResource::new(d);
                if r.name() == "bob" {
                    r.prefetch(&bob);
                }
                r.decide(&reconciler);
                Box::new(r) as Box<dyn Resource>
            })
            .collect()
    }

    #[test]
    fn test_failures_do_not_stop_siblings() {
        let runner = FailingUsermod { runs: Cell::new(0) };
        let summary = run_sequential(&resources(), &runner, false, false);

        assert_eq!(
            summary,
            ExecuteSummary {
                created: 1,
                failed: 2,
                no_change: 1,
                ..Default::default()
            }
        );
        assert_eq!(runner.runs.get(), 2);
        assert!(!summary.is_success());
        assert_eq!(summary.total_changes(), 1);
    }

    #[test]
    fn test_dry_run_counts_skips() {
        let runner = FailingUsermod { runs: Cell::new(0) };
        let summary = run_sequential(&resources(), &runner, true, false);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(runner.runs.get(), 0);
    }
}
