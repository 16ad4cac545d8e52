//! Diff computation and display

use colored::Colorize;
use std::collections::BTreeMap;

use crate::resource::{Resource, ResourceDiff, ResourceState};

/// A resource whose state couldn't be decided (e.g. a value failed validation)
#[derive(Debug, Clone)]
pub struct DiffFailure {
    pub resource_id: String,
    pub error: String,
}

/// Compute diffs for all resources, keeping undecidable ones apart
pub fn compute_diffs(resources: &[Box<dyn Resource>]) -> (Vec<ResourceDiff>, Vec<DiffFailure>) {
    let mut diffs = Vec::new();
    let mut failures = Vec::new();

    for resource in resources {
        match ResourceDiff::from_resource(resource.as_ref()) {
            Ok(Some(diff)) => diffs.push(diff),
            Ok(None) => {}
            Err(e) => failures.push(DiffFailure {
                resource_id: resource.id(),
                error: format!("{e:#}"),
            }),
        }
    }

    (diffs, failures)
}

fn symbol(diff: &ResourceDiff) -> colored::ColoredString {
    match (&diff.current, &diff.desired) {
        (ResourceState::Absent, ResourceState::Present { .. }) => "+".green(),
        (ResourceState::Present { .. }, ResourceState::Absent) => "-".red(),
        (ResourceState::Modified { .. }, _) | (_, ResourceState::Modified { .. }) => "~".yellow(),
        _ => "?".dimmed(),
    }
}

fn state_description(diff: &ResourceDiff) -> String {
    match (&diff.current, &diff.desired) {
        (ResourceState::Absent, ResourceState::Present { details }) => format!(
            "(missing){}",
            details
                .as_ref()
                .map(|d| format!(" → {d}"))
                .unwrap_or_default()
        ),
        (ResourceState::Modified { from, to }, _) => format!("{from} → {to}"),
        (ResourceState::Present { .. }, ResourceState::Absent) => "(will remove)".to_string(),
        _ => String::new(),
    }
}

fn type_heading(resource_type: &str) -> &str {
    match resource_type {
        "user" => "Accounts",
        other => other,
    }
}

fn boundary_line(diff: &ResourceDiff) -> String {
    match &diff.sudo_reason {
        Some(reason) => format!("{} ({reason})", diff.description),
        None => diff.description.clone(),
    }
}

/// Display a list of diffs in a user-friendly format
pub fn display_diff(diffs: &[ResourceDiff], failures: &[DiffFailure]) {
    if diffs.is_empty() && failures.is_empty() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Account Diff".bold()
    );
    println!("│");

    // Group by resource type
    let mut by_type: BTreeMap<&str, Vec<&ResourceDiff>> = BTreeMap::new();
    for diff in diffs {
        by_type
            .entry(diff.resource_type.as_str())
            .or_default()
            .push(diff);
    }

    for (resource_type, type_diffs) in &by_type {
        println!("│ {}", type_heading(resource_type).bold());

        for diff in type_diffs {
            let sudo_indicator = if diff.requires_sudo() {
                " [sudo]".red().to_string()
            } else {
                String::new()
            };

            println!(
                "│   {} {:<24} {}{}",
                symbol(diff),
                diff.resource_id,
                state_description(diff).dimmed(),
                sudo_indicator
            );
        }
    }

    for failure in failures {
        println!(
            "│   {} {:<24} {}",
            "✗".red(),
            failure.resource_id,
            failure.error.red()
        );
    }
    println!("│");

    let sudo_count = diffs.iter().filter(|d| d.requires_sudo()).count();
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} changes ({} require sudo), {} invalid",
        diffs.len().to_string().bold(),
        sudo_count.to_string().red(),
        failures.len().to_string().red()
    );
    println!("└─────────────────────────────────────────────────────┘");
}

/// Display the sudo boundary warning
pub fn display_sudo_boundary(privileged_diffs: &[ResourceDiff]) {
    if privileged_diffs.is_empty() {
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Privilege Boundary".yellow().bold()
    );
    println!("│");
    println!(
        "│  {}  The following {} operations require sudo:",
        "⚠".yellow(),
        privileged_diffs.len()
    );
    println!("│");

    for diff in privileged_diffs.iter().take(10) {
        println!("│  • {}", boundary_line(diff));
    }

    if privileged_diffs.len() > 10 {
        println!("│  • ... and {} more", privileged_diffs.len() - 10);
    }

    println!("│");
    println!("│  Sudo will be requested once and released immediately after.");
    println!("│");
    println!("└─────────────────────────────────────────────────────────────┘");
}
