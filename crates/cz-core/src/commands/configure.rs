use std::io::Write;

use crate::app::App;
use crate::error::CoreError;
use crate::integration::{
    self, captures_failures, integration_script, validate_alias, InjectOutcome, IntegrationStatus,
};
use crate::shell::ShellEnvironment;

/// Install, or with `remove` uninstall, the integration block.
pub fn run(app: &App, remove: bool, out: &mut dyn Write) -> Result<(), CoreError> {
    let env = app.shell()?;
    let config_path = env.config_path.display().to_string();

    if remove {
        if integration::remove(env)? {
            writeln!(out, "CmdZen integration removed from {config_path}.")?;
            writeln!(out, "Restart your terminal to unload it.")?;
        } else {
            writeln!(out, "CmdZen integration not found in {config_path}.")?;
        }
        return Ok(());
    }

    validate_alias(&app.config.shell.alias)?;

    writeln!(out, "Installing CmdZen integration for {}...", env.shell_name())?;
    writeln!(out, "Config file: {config_path}")?;
    writeln!(out)?;

    let script = integration_script(
        env.kind,
        app.exe_path(),
        app.capture.path(),
        &app.config.shell.alias,
    );

    match integration::inject(env, &script) {
        Ok(outcome) => {
            write!(out, "{}", success_message(app, env, outcome))?;
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to inject shell integration");
            writeln!(out, "Failed to inject shell integration: {e}")?;
            Ok(())
        }
    }
}

fn success_message(app: &App, env: &ShellEnvironment, outcome: InjectOutcome) -> String {
    let shell = env.shell_name();
    let config_path = env.config_path.display();
    let mut text = String::new();

    match outcome {
        InjectOutcome::Installed => {
            text.push_str(&app.style.green("CmdZen integration successfully installed!"))
        }
        InjectOutcome::Updated => {
            text.push_str(&app.style.green("CmdZen integration successfully updated!"))
        }
    }
    text.push_str("\n\n");

    text.push_str("What was added:\n");
    if captures_failures(env.kind) {
        text.push_str(&format!("- Command capture hooks in your {shell} config\n"));
        text.push_str("- Failed commands are now automatically recorded\n");
    } else {
        text.push_str(&format!(
            "- The '{}' alias in your {shell} config\n",
            app.config.shell.alias
        ));
        text.push_str(&format!(
            "- {shell} has no command hooks; 'solve' will re-run the last command from history\n"
        ));
    }
    text.push_str("- The 'solve' command can now analyze errors without guessing the command\n\n");

    text.push_str(&app.style.yellow("⚠️  IMPORTANT: Restart your terminal or run:"));
    text.push('\n');
    text.push_str(&format!("   source {config_path}\n\n"));
    text.push_str("After restarting, failed commands will be automatically captured.\n");
    text.push_str("Just run 'cmdzen solve' after any error to get AI-powered help!\n");
    text
}

pub fn status(app: &App, out: &mut dyn Write) -> Result<(), CoreError> {
    let env = app.shell()?;
    let shell = env.shell_name();
    let config_path = env.config_path.display();

    let status = match integration::status(env) {
        Ok(status) => status,
        Err(e) => {
            tracing::error!(error = %e, "error checking integration status");
            writeln!(out, "Error checking integration: {e}")?;
            return Ok(());
        }
    };

    match status {
        IntegrationStatus::ConfigMissing => {
            writeln!(out, "Config file not found: {config_path}")?;
        }
        IntegrationStatus::Installed => {
            writeln!(out, "CmdZen integration is installed in {shell}")?;
            writeln!(out, "Config: {config_path}")?;
            writeln!(out)?;
            writeln!(
                out,
                "Failed commands will be automatically captured for 'solve' command."
            )?;
        }
        IntegrationStatus::NotInstalled => {
            writeln!(out, "CmdZen integration not found in {shell}")?;
            writeln!(out, "Run 'cmdzen configure' to install it.")?;
        }
    }
    Ok(())
}
