//! Scoped sudo context
//!
//! Account tools need root. When roster itself isn't root:
//! 1. All plans are computed first (no sudo needed to read passwd/group)
//! 2. Sudo is acquired once, only if something has to run
//! 3. Sudo is released when the context drops

use anyhow::{Context, Result, bail};
use std::process::Command;

use crate::runner::{CommandOutput, CommandRunner};

/// Scoped sudo context - automatically invalidates on drop
pub struct SudoContext {
    validated: bool,
}

impl SudoContext {
    /// Acquire sudo privileges with a reason shown to user
    pub fn acquire(reason: &str) -> Result<Self> {
        eprintln!();
        eprintln!("  Sudo required: {}", reason);
        eprintln!();

        // Validate sudo (will prompt for password)
        let status = Command::new("sudo")
            .args(["-v"])
            .status()
            .context("Failed to execute sudo")?;

        if !status.success() {
            bail!("Failed to acquire sudo privileges");
        }

        Ok(Self { validated: true })
    }

    /// Check if sudo is currently valid (without prompting)
    pub fn is_valid() -> bool {
        Command::new("sudo")
            .args(["-n", "true"])
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

impl CommandRunner for SudoContext {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        if !self.validated {
            bail!("Sudo context not validated");
        }

        log::debug!("exec: sudo {} {}", program, args.join(" "));
        let output = Command::new("sudo")
            .arg("--")
            .arg(program)
            .args(args)
            .output()
            .with_context(|| format!("Failed to execute: sudo {} {:?}", program, args))?;

        Ok(output.into())
    }
}

impl Drop for SudoContext {
    fn drop(&mut self) {
        // Invalidate sudo timestamp to release privileges
        let _ = Command::new("sudo").args(["-k"]).status();
    }
}

/// Whether the current process already runs as root
#[cfg(unix)]
pub fn is_root() -> bool {
    // SAFETY: geteuid takes no arguments, cannot fail and touches no memory.
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
pub fn is_root() -> bool {
    false
}
