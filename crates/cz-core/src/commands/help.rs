use std::io::Write;

use clap::CommandFactory;

use crate::cli::Cli;
use crate::error::CoreError;

const BANNER: &str = "\
CmdZen - YOUR LINUX COMMANDLINE ASSISTANT

Usage:
  cmdzen [OPTIONS] [COMMAND]

Description:
  CmdZen helps new Linux users by providing command explanations,
  installation guidance, command recommendations, and dynamic command creation.

Options:
  --help, -h      Show this help message
  --create        Start dynamic command creation wizard
  --install       Begin guided distro installation
  --explain       Explain an error message
  --recommend     Suggest useful commands

Example:
  cmdzen --create
";

/// Banner followed by every registered command and its description.
pub fn help_text() -> String {
    let cli = Cli::command();
    let entries: Vec<(String, String)> = cli
        .get_subcommands()
        .map(|sub| {
            let mut label = sub.get_name().to_string();
            if let Some(short) = sub.get_short_flag() {
                label.push_str(&format!(", -{short}"));
            }
            for alias in sub.get_visible_aliases() {
                label.push_str(&format!(", {alias}"));
            }
            let about = sub.get_about().map(|a| a.to_string()).unwrap_or_default();
            (label, about)
        })
        .collect();

    let width = entries.iter().map(|(l, _)| l.len()).max().unwrap_or(0) + 2;
    let mut text = String::from(BANNER);
    text.push_str("\nCommands:\n");
    for (label, about) in entries {
        text.push_str(&format!("  {label:<width$}{about}\n"));
    }
    text
}

pub fn run(out: &mut dyn Write) -> Result<(), CoreError> {
    write!(out, "{}", help_text())?;
    Ok(())
}
