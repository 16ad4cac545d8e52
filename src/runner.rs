//! Process execution for constructed account commands

use anyhow::{Context, Result};
use std::process::{Command, Output, Stdio};

/// Output from an executed command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub success: bool,
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            stdout: output.stdout,
            stderr: output.stderr,
            success: output.status.success(),
        }
    }
}

impl CommandOutput {
    /// Get stderr as a string
    pub fn stderr_str(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }
}

/// Runs a program with an argument vector.
///
/// Arguments are passed as-is, never through a shell, so values with
/// spaces (comments, home paths) need no quoting.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput>;
}

/// Runs commands as the current user
pub struct Direct;

impl CommandRunner for Direct {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        log::debug!("exec: {} {}", program, args.join(" "));
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("Failed to execute: {} {}", program, args.join(" ")))?;
        Ok(output.into())
    }
}

/// Check if a command exists
pub fn command_exists(cmd: &str) -> bool {
    Command::new("which")
        .arg(cmd)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_runs_with_argv() {
        let output = Direct
            .run("echo", &["hello world".to_string()])
            .expect("echo should run");
        assert!(output.success);
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello world");
    }

    #[test]
    fn test_direct_reports_failure() {
        let output = Direct.run("false", &[]).expect("false should run");
        assert!(!output.success);
    }

    #[test]
    fn test_missing_program_is_error() {
        assert!(Direct.run("roster-no-such-program", &[]).is_err());
    }
}
