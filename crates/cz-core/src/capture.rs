//! The capture file written by the shell integration hook.
//!
//! Layout, one field per line:
//!
//! ```text
//! __CMDZEN_CMD_START__
//! COMMAND: make
//! EXIT_CODE: 2
//! TIMESTAMP: 2024-05-01T10:00:00+0200
//! <optional output lines>
//! ```

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const START_MARKER: &str = "__CMDZEN_CMD_START__";
pub const COMMAND_PREFIX: &str = "COMMAND:";
pub const EXIT_CODE_PREFIX: &str = "EXIT_CODE:";
pub const TIMESTAMP_PREFIX: &str = "TIMESTAMP:";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedCommand {
    pub command: Option<String>,
    pub exit_code: Option<i32>,
    pub timestamp: Option<String>,
    /// Output lines joined with `\n`, untrimmed per line.
    pub output: String,
}

impl CapturedCommand {
    pub fn parse(text: &str) -> Self {
        let mut captured = Self::default();

        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with(START_MARKER) {
                continue;
            }

            if let Some(rest) = trimmed.strip_prefix(COMMAND_PREFIX) {
                captured.command = Some(rest.trim().to_string());
            } else if let Some(rest) = trimmed.strip_prefix(EXIT_CODE_PREFIX) {
                // An unparsable code keeps whatever was seen before.
                if let Ok(code) = rest.trim().parse() {
                    captured.exit_code = Some(code);
                }
            } else if let Some(rest) = trimmed.strip_prefix(TIMESTAMP_PREFIX) {
                captured.timestamp = Some(rest.trim().to_string());
            } else {
                if !captured.output.is_empty() {
                    captured.output.push('\n');
                }
                captured.output.push_str(line);
            }
        }

        captured
    }

    pub fn has_output(&self) -> bool {
        !self.output.trim().is_empty()
    }

    /// Serialize back into the capture file layout.
    pub fn to_file_format(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{START_MARKER}");
        if let Some(ref command) = self.command {
            let _ = writeln!(out, "{COMMAND_PREFIX} {command}");
        }
        if let Some(code) = self.exit_code {
            let _ = writeln!(out, "{EXIT_CODE_PREFIX} {code}");
        }
        if let Some(ref ts) = self.timestamp {
            let _ = writeln!(out, "{TIMESTAMP_PREFIX} {ts}");
        }
        if !self.output.is_empty() {
            let _ = writeln!(out, "{}", self.output);
        }
        out
    }
}

/// Remove the marker and metadata lines, keeping only command output.
pub fn strip_metadata(captured: &str) -> String {
    captured
        .lines()
        .filter(|line| {
            ![START_MARKER, EXIT_CODE_PREFIX, COMMAND_PREFIX, TIMESTAMP_PREFIX]
                .iter()
                .any(|prefix| line.starts_with(prefix))
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Access to the capture file on disk.
#[derive(Debug, Clone)]
pub struct CaptureStore {
    path: PathBuf,
}

impl CaptureStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw file contents. `None` when the file is missing or blank.
    pub fn read(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(None),
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Parsed capture, or `None` if there is none or it cannot be read.
    pub fn load(&self) -> Option<CapturedCommand> {
        match self.read() {
            Ok(text) => text.map(|t| CapturedCommand::parse(&t)),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to read capture file");
                None
            }
        }
    }

    /// Exit code of the captured command, 0 if nothing was captured.
    pub fn last_exit_code(&self) -> i32 {
        self.load().and_then(|c| c.exit_code).unwrap_or(0)
    }

    pub fn write(&self, captured: &CapturedCommand) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, captured.to_file_format())
    }
}
