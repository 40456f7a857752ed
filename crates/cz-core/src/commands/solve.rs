use std::io::{self, Write};
use std::time::Duration;

use crate::app::App;
use crate::capture::{strip_metadata, CapturedCommand};
use crate::error::CoreError;
use crate::process::rerun;
use crate::prompt::build_prompt;

const RULE: &str = "------------------------------";

pub async fn run(app: &App, user_prompt: &str, out: &mut dyn Write) -> Result<(), CoreError> {
    match solve(app, user_prompt, out).await {
        Ok(()) => Ok(()),
        // Nobody is reading the output any more.
        Err(CoreError::Io(e)) if e.kind() == io::ErrorKind::BrokenPipe => Err(e.into()),
        Err(CoreError::Ai(e)) => {
            writeln!(out, "{}", app.style.red(&format!("AI Error: {e}")))?;
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "error in solve command");
            writeln!(out, "Error analyzing command: {e}")?;
            Ok(())
        }
    }
}

async fn solve(app: &App, user_prompt: &str, out: &mut dyn Write) -> Result<(), CoreError> {
    let raw = app.capture.read()?;
    let captured = raw.as_deref().map(CapturedCommand::parse);

    let from_capture = captured
        .as_ref()
        .and_then(|c| c.command.clone())
        .filter(|c| !c.is_empty());
    let command = match from_capture {
        Some(c) => c,
        None => match app.last_history_command()? {
            Some(c) => c,
            None => {
                writeln!(out, "No previous command found in history.")?;
                return Ok(());
            }
        },
    };
    tracing::debug!(command = %command, "last command");

    let exit_code = captured.as_ref().and_then(|c| c.exit_code).unwrap_or(0);
    let has_output = captured.as_ref().is_some_and(CapturedCommand::has_output);

    let prompt = if exit_code != 0 && has_output {
        tracing::info!("using captured output from shell integration");
        let output = raw.as_deref().map(strip_metadata).unwrap_or_default();
        writeln!(out, "Analyzing failed command: {command}")?;
        writeln!(out, "Exit code: {exit_code}")?;
        writeln!(out, "Captured output:")?;
        writeln!(out, "{RULE}")?;
        writeln!(out, "{output}")?;
        writeln!(out, "{RULE}")?;
        build_prompt(&command, exit_code, &output, user_prompt, true)
    } else {
        tracing::info!("no captured output found, re-running command");
        writeln!(
            out,
            "Re-running command to capture output: {}",
            app.style.bold(&command)
        )?;
        out.flush()?;

        let timeout = Duration::from_secs(app.config.shell.rerun_timeout_secs);
        let result = rerun(&command, timeout).await?;
        if result.timed_out {
            tracing::warn!(command = %command, secs = timeout.as_secs(), "re-run timed out");
        }
        writeln!(out, "Exit code: {}", result.exit_code)?;
        tracing::debug!(output = %result.output, "command output");

        if result.exit_code != 0 {
            let record = CapturedCommand {
                command: Some(command.clone()),
                exit_code: Some(result.exit_code),
                timestamp: captured.and_then(|c| c.timestamp),
                output: result.output.trim_end().to_string(),
            };
            if let Err(e) = app.capture.write(&record) {
                tracing::warn!(error = %e, "failed to record re-run output");
            }
        }
        build_prompt(&command, result.exit_code, &result.output, user_prompt, false)
    };

    writeln!(out)?;
    let ai = app.ai().await?;
    if app.config.openrouter.stream {
        let mut write_error: Option<io::Error> = None;
        ai.ask_streaming(&prompt, |chunk| {
            if write_error.is_some() {
                return;
            }
            if let Err(e) = out.write_all(chunk.as_bytes()).and_then(|()| out.flush()) {
                write_error = Some(e);
            }
        })
        .await?;
        if let Some(e) = write_error {
            return Err(e.into());
        }
        writeln!(out)?;
    } else {
        let answer = ai.ask(&prompt).await?;
        writeln!(out, "{answer}")?;
    }
    Ok(())
}
