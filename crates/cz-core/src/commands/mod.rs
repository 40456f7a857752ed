//! Command implementations. Each writes its user-facing text to `out`.

pub mod alias;
pub mod configure;
pub mod help;
pub mod history;
pub mod last_failed;
pub mod metrics;
pub mod solve;
pub mod version;

use std::io::Write;

use crate::app::App;
use crate::cli::Command;
use crate::error::CoreError;

/// Run one command.
///
/// `Command::Shell` is handled by the caller; dispatching it here only
/// prints a note.
pub async fn dispatch(app: &App, command: &Command, out: &mut dyn Write) -> Result<(), CoreError> {
    app.metrics.record_command(command.name());
    tracing::debug!(command = command.name(), "dispatching command");

    match command {
        Command::Help => help::run(out),
        Command::Version => version::run(out),
        Command::Solve { prompt } => solve::run(app, prompt, out).await,
        Command::LastFailed => last_failed::run(app, out),
        Command::Local => history::local(app, out),
        Command::History => history::session(app, out),
        Command::Configure { remove } => configure::run(app, *remove, out),
        Command::IntegrationStatus => configure::status(app, out),
        Command::Alias { new } => alias::run(app, new, out),
        Command::Metrics => metrics::run(app, out),
        Command::Shell => {
            writeln!(out, "Already in the interactive shell.")?;
            Ok(())
        }
    }
}
