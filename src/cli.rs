use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "roster")]
#[command(version)]
#[command(about = "Declarative local user account management", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: ~/.config/roster/config.toml)
    #[arg(short, long, global = true, env = "ROSTER_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Preview what apply would change
    Diff(DiffArgs),

    /// Make the host's accounts match the config
    Apply(ApplyArgs),

    /// List accounts as they exist now, in config format
    List(ListArgs),

    /// Check account databases, tools and config
    Doctor,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Args)]
pub struct DiffArgs {
    /// Only accounts whose name contains this text
    pub target: Option<String>,

    /// Print the decided plans as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Only accounts whose name contains this text
    pub target: Option<String>,

    /// Show the commands without running them
    #[arg(long)]
    pub dry_run: bool,

    /// Don't ask for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "toml")]
    pub format: ListFormat,

    /// Only accounts whose name contains this text
    pub target: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListFormat {
    Toml,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_apply_flags() {
        let cli = Cli::parse_from(["roster", "-vv", "apply", "bob", "--dry-run", "-y"]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Apply(args) => {
                assert_eq!(args.target.as_deref(), Some("bob"));
                assert!(args.dry_run);
                assert!(args.yes);
            }
            _ => panic!("expected apply"),
        }
    }

    #[test]
    fn test_list_defaults_to_toml() {
        let cli = Cli::parse_from(["roster", "list", "--config", "/tmp/x.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/x.toml")));
        match cli.command {
            Command::List(args) => assert_eq!(args.format, ListFormat::Toml),
            _ => panic!("expected list"),
        }
    }
}
