use std::io::Write;

use crate::app::App;
use crate::capture::CapturedCommand;
use crate::error::CoreError;

const HEAVY_RULE: &str = "═══════════════════════════════════════════════════════";
const LIGHT_RULE: &str = "───────────────────────────────────────────────────────";

pub fn run(app: &App, out: &mut dyn Write) -> Result<(), CoreError> {
    let raw = match app.capture.read() {
        Ok(raw) => raw,
        Err(e) => {
            tracing::error!(path = %app.capture.path().display(), error = %e, "failed to read capture file");
            writeln!(out, "Error retrieving last failed command: {e}")?;
            return Ok(());
        }
    };

    let Some(raw) = raw else {
        writeln!(out, "{}", app.style.red("❌ No failed command found."))?;
        writeln!(
            out,
            "Make sure you've run 'cmdzen configure' to enable command capture."
        )?;
        return Ok(());
    };

    let captured = CapturedCommand::parse(&raw);
    let command = match captured.command {
        Some(ref c) => c.clone(),
        None => app.last_history_command().ok().flatten().unwrap_or_default(),
    };
    let exit_code = captured
        .exit_code
        .unwrap_or_else(|| app.capture.last_exit_code());

    write!(
        out,
        "{}",
        render(&command, exit_code, captured.timestamp.as_deref(), &captured.output)
    )?;
    Ok(())
}

/// The boxed report shown by `last-failed`.
pub fn render(command: &str, exit_code: i32, timestamp: Option<&str>, output: &str) -> String {
    let mut text = String::new();
    text.push_str(HEAVY_RULE);
    text.push('\n');
    text.push_str("🔴 LAST FAILED COMMAND\n");
    text.push_str(HEAVY_RULE);
    text.push_str("\n\n");

    text.push_str(&format!("Command:\n  $ {command}\n\n"));
    text.push_str(&format!("Exit Code: {exit_code}\n"));
    if let Some(ts) = timestamp.filter(|ts| !ts.is_empty()) {
        text.push_str(&format!("Time: {ts}\n"));
    }
    text.push('\n');

    let output = output.trim();
    if output.is_empty() {
        text.push_str("(No output captured)\n");
    } else {
        text.push_str("Output:\n");
        text.push_str(LIGHT_RULE);
        text.push('\n');
        text.push_str(output);
        text.push('\n');
        text.push_str(LIGHT_RULE);
        text.push('\n');
    }
    text
}
