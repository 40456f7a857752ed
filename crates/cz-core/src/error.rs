use std::io;

use thiserror::Error;

use crate::ai::AiError;
use crate::history::HistoryError;
use crate::integration::IntegrationError;
use crate::shell::ShellError;

/// Errors surfaced by commands.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Shell(#[from] ShellError),
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error(transparent)]
    Integration(#[from] IntegrationError),
    #[error(transparent)]
    Ai(#[from] AiError),
    #[error("AI backend setup failed: {0}")]
    Backend(#[from] cz_backend::BackendError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
