use acctkit::{Directory, ShadowCapability};
use anyhow::Result;
use colored::Colorize;

use crate::Context;
use crate::config::{self, RosterConfig};
use crate::runner;
use crate::sudo;
use crate::ui;

struct Issue {
    category: &'static str,
    summary: String,
    fix: Option<String>,
}

pub fn run(ctx: &Context) -> Result<()> {
    ui::header("Account Health Check");

    let mut issues: Vec<Issue> = Vec::new();

    // Check 1: Configuration
    let config = check_config(ctx, &mut issues);

    // Check 2: Account databases
    check_databases(&config, &mut issues);

    // Check 3: Account tools
    check_tools(&config, &mut issues);

    // Check 4: Privileges
    check_privileges(&config, &mut issues);

    // Summary
    println!();
    if issues.is_empty() {
        ui::success("All checks passed!");
    } else {
        print_issue_summary(&issues);
    }

    Ok(())
}

fn print_issue_summary(issues: &[Issue]) {
    let count = issues.len();
    let label = if count == 1 { "Issue" } else { "Issues" };
    ui::header(&format!("{count} {label} Found"));

    for (i, issue) in issues.iter().enumerate() {
        let num = i + 1;
        println!(
            "  {}  {} {}",
            format!("{num}.").bold(),
            issue.summary,
            format!("[{}]", issue.category).dimmed()
        );
        if let Some(fix) = &issue.fix {
            println!("      {} {}", "Fix:".cyan(), fix);
        }
        println!();
    }
}

fn check_config(ctx: &Context, issues: &mut Vec<Issue>) -> RosterConfig {
    ui::section("Configuration");

    match RosterConfig::load(ctx.config.as_deref()) {
        Ok((config, path)) => {
            ui::check(
                true,
                &path.display().to_string(),
                &format!("{} accounts", config.users.len()),
            );
            config
        }
        Err(e) => {
            let reason = format!("{e:#}");
            ui::check(false, "config", &reason);
            let fix = config::config_dir()
                .map(|d| format!("Create {}", d.join("config.toml").display()))
                .ok();
            issues.push(Issue {
                category: "Configuration",
                summary: format!("Config not usable: {reason}"),
                fix,
            });
            RosterConfig::default()
        }
    }
}

fn check_databases(config: &RosterConfig, issues: &mut Vec<Issue>) {
    ui::section("Account Databases");

    let directory = Directory::new(config.paths.passwd_path(), config.paths.group_path());

    let scans = [
        (
            directory.passwd_path().display().to_string(),
            directory.read_accounts().map(|s| (s.records.len(), s.skipped)),
        ),
        (
            directory.group_path().display().to_string(),
            directory.read_groups().map(|s| (s.records.len(), s.skipped)),
        ),
    ];

    for (path, scan) in scans {
        match scan {
            Ok((records, 0)) => ui::check(true, &path, &format!("{records} entries")),
            Ok((records, skipped)) => {
                ui::check(
                    true,
                    &path,
                    &format!("{records} entries, {skipped} malformed lines"),
                );
                issues.push(Issue {
                    category: "Account Databases",
                    summary: format!("{path} has {skipped} malformed lines"),
                    fix: Some("Run pwck/grpck to inspect them".into()),
                });
            }
            Err(e) => {
                ui::check(false, &path, &e.to_string());
                issues.push(Issue {
                    category: "Account Databases",
                    summary: e.to_string(),
                    fix: None,
                });
            }
        }
    }

    let shadow = config.paths.shadow_path();
    match ShadowCapability::probe(&shadow) {
        ShadowCapability::Available => {
            ui::check(true, &shadow.display().to_string(), "readable");
        }
        ShadowCapability::Unavailable => {
            // Not an issue: password and aging properties are just not compared
            ui::warn(&format!(
                "{} not readable - password and aging changes won't be detected",
                shadow.display()
            ));
        }
    }

    ui::kv("platform", &config.platform().to_string());
}

fn check_tools(config: &RosterConfig, issues: &mut Vec<Issue>) {
    ui::section("Account Tools");

    let commands = &config.commands;
    let tools = [
        (&commands.add, "create accounts"),
        (&commands.modify, "modify accounts"),
        (&commands.delete, "remove accounts"),
        (&commands.password, "set password aging"),
    ];

    for (tool, purpose) in tools {
        let found = runner::command_exists(tool);
        ui::check(found, tool, purpose);
        if !found {
            issues.push(Issue {
                category: "Account Tools",
                summary: format!("{tool} not found"),
                fix: Some("Install the shadow-utils (or passwd) package".into()),
            });
        }
    }
}

fn check_privileges(config: &RosterConfig, issues: &mut Vec<Issue>) {
    ui::section("Privileges");

    if sudo::is_root() {
        ui::check(true, "root", "commands run directly");
        return;
    }

    if !config.sudo {
        ui::info("Not root and sudo disabled - apply will likely be refused by the tools");
        issues.push(Issue {
            category: "Privileges",
            summary: "Account changes need root".into(),
            fix: Some("Set `sudo = true` in the config or run as root".into()),
        });
        return;
    }

    let found = runner::command_exists("sudo");
    ui::check(found, "sudo", "used once per apply");
    if !found {
        ui::error("sudo is enabled in the config but not installed");
        issues.push(Issue {
            category: "Privileges",
            summary: "sudo not found".into(),
            fix: Some("Install sudo or run as root".into()),
        });
    } else if sudo::SudoContext::is_valid() {
        ui::kv("sudo", "credentials cached");
    }
}
