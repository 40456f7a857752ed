use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

pub const DEFAULT_SOLVE_PROMPT: &str = "Help me fix this error";

#[derive(Parser, Debug)]
#[command(name = "cmdzen")]
#[command(about = "Your Linux command-line assistant")]
#[command(disable_help_flag = true)]
#[command(disable_version_flag = true)]
#[command(disable_help_subcommand = true)]
/// Command-line arguments.
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (default: ~/.config/cmdzen/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Command to run; starts the interactive shell when omitted.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Shows all commands
    #[command(short_flag = 'h', long_flag = "help")]
    Help,
    /// Display the version of Cmdzen
    #[command(short_flag = 'V', long_flag = "version")]
    Version,
    /// Analyze and suggest fixes for failed commands
    #[command(short_flag = 's')]
    Solve {
        /// Additional context or question
        #[arg(short, long, default_value = DEFAULT_SOLVE_PROMPT)]
        prompt: String,
    },
    /// Shows the last failed command and its output
    #[command(visible_alias = "lf")]
    LastFailed,
    /// Gives the local shell history
    Local,
    /// Gives the history of this interactive session
    History,
    /// Add CmdZen integration into your shell config
    #[command(short_flag = 'c')]
    Configure {
        /// Remove the integration instead
        #[arg(long)]
        remove: bool,
    },
    /// Check if shell integration is installed
    IntegrationStatus,
    /// Change alias
    #[command(short_flag = 'a')]
    Alias {
        /// New alias name
        #[arg(short, long = "new", value_name = "NAME")]
        new: String,
    },
    /// Print process metrics in Prometheus text format
    Metrics,
    /// Start the interactive shell
    Shell,
}

impl Command {
    /// Name used in logs and metric labels.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Help => "help",
            Command::Version => "version",
            Command::Solve { .. } => "solve",
            Command::LastFailed => "last-failed",
            Command::Local => "local",
            Command::History => "history",
            Command::Configure { .. } => "configure",
            Command::IntegrationStatus => "integration-status",
            Command::Alias { .. } => "alias",
            Command::Metrics => "metrics",
            Command::Shell => "shell",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("cmdzen").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_args_means_no_command() {
        let cli = parse(&[]);
        assert!(cli.command.is_none());
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn short_flags_select_commands() {
        assert_eq!(parse(&["-h"]).command, Some(Command::Help));
        assert_eq!(parse(&["--help"]).command, Some(Command::Help));
        assert_eq!(parse(&["-V"]).command, Some(Command::Version));
        assert_eq!(parse(&["-c"]).command, Some(Command::Configure { remove: false }));
        assert_eq!(parse(&["lf"]).command, Some(Command::LastFailed));
    }

    #[test]
    fn solve_prompt_default_and_override() {
        assert_eq!(
            parse(&["solve"]).command,
            Some(Command::Solve {
                prompt: DEFAULT_SOLVE_PROMPT.to_string()
            })
        );
        assert_eq!(
            parse(&["-s", "--prompt", "why?"]).command,
            Some(Command::Solve {
                prompt: "why?".to_string()
            })
        );
    }

    #[test]
    fn alias_requires_name() {
        assert_eq!(
            parse(&["alias", "--new", "cz"]).command,
            Some(Command::Alias {
                new: "cz".to_string()
            })
        );
        assert!(Cli::try_parse_from(["cmdzen", "alias"]).is_err());
    }

    #[test]
    fn global_flags_after_command() {
        let cli = parse(&["metrics", "-vv", "--no-color", "--config", "/tmp/c.toml"]);
        assert_eq!(cli.command, Some(Command::Metrics));
        assert_eq!(cli.verbose, 2);
        assert!(cli.no_color);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
    }

    #[test]
    fn names_match_clap() {
        let cmd = Cli::command();
        for sub in cmd.get_subcommands() {
            let args = ["cmdzen", sub.get_name(), "--new", "x"];
            let args: &[&str] = if sub.get_name() == "alias" { &args } else { &args[..2] };
            let cli = Cli::try_parse_from(args).unwrap();
            assert_eq!(cli.command.unwrap().name(), sub.get_name());
        }
    }
}
