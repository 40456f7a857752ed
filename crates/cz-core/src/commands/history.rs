use std::io::Write;

use crate::app::App;
use crate::error::CoreError;
use crate::history::{read_local_history, CommandHistory};

fn print(history: &CommandHistory, out: &mut dyn Write) -> Result<(), CoreError> {
    if !history.is_empty() {
        writeln!(out, "{}", history.render())?;
    }
    Ok(())
}

/// The shell's on-disk history.
pub fn local(app: &App, out: &mut dyn Write) -> Result<(), CoreError> {
    let history = read_local_history(app.shell()?)?;
    tracing::debug!(count = history.count(), "local history loaded");
    print(&history, out)
}

/// Lines entered in the interactive shell.
pub fn session(app: &App, out: &mut dyn Write) -> Result<(), CoreError> {
    print(&app.session.snapshot(), out)
}
