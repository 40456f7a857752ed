//! Shell history files and the interactive session history.
//!
//! Each shell writes its history in its own format: bash may interleave
//! `#<epoch>` timestamp lines, zsh has an extended `: <epoch>:<dur>;cmd`
//! form with backslash continuations, and fish writes a YAML-like list.

use std::collections::VecDeque;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::fsutil::write_atomic;
use crate::shell::{ShellEnvironment, ShellKind};

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("failed to read shell history from {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
}

/// An ordered list of commands, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandHistory {
    count: usize,
    entries: Vec<String>,
}

impl CommandHistory {
    pub fn new(entries: Vec<String>) -> Self {
        Self {
            count: entries.len(),
            entries,
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The most recent entry whose first word is not rejected by `skip`.
    pub fn last_command(&self, skip: impl Fn(&str) -> bool) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .map(String::as_str)
            .find(|entry| {
                let first = entry.split_whitespace().next().unwrap_or("");
                !first.is_empty() && !skip(first)
            })
    }

    /// One entry per line.
    pub fn render(&self) -> String {
        self.entries.join("\n")
    }
}

/// Parse raw history file bytes for the given shell.
pub fn parse_history(kind: ShellKind, bytes: &[u8]) -> CommandHistory {
    // zsh metafies non-ASCII bytes, so decode lossily rather than fail.
    let text = String::from_utf8_lossy(bytes);
    let entries = match kind {
        ShellKind::Bash => parse_bash(&text),
        ShellKind::Zsh => parse_zsh(&text),
        ShellKind::Fish => parse_fish(&text),
        ShellKind::Ksh => parse_ksh(&text),
    };
    CommandHistory::new(entries)
}

fn parse_bash(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| !is_bash_timestamp(line))
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

fn is_bash_timestamp(line: &str) -> bool {
    line.strip_prefix('#')
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
}

fn parse_zsh(text: &str) -> Vec<String> {
    let mut entries = Vec::new();
    let mut current: Option<String> = None;

    for line in text.lines() {
        let piece = match current.take() {
            Some(mut open) => {
                open.push('\n');
                open.push_str(line);
                open
            }
            None => strip_zsh_extended(line).to_string(),
        };

        if let Some(continued) = piece.strip_suffix('\\') {
            current = Some(continued.to_string());
        } else if !piece.trim().is_empty() {
            entries.push(piece);
        }
    }

    if let Some(open) = current {
        if !open.trim().is_empty() {
            entries.push(open);
        }
    }
    entries
}

/// `: 1700000000:0;git status` -> `git status`
fn strip_zsh_extended(line: &str) -> &str {
    let Some(rest) = line.strip_prefix(": ") else {
        return line;
    };
    match rest.split_once(';') {
        Some((meta, cmd))
            if !meta.is_empty() && meta.bytes().all(|b| b.is_ascii_digit() || b == b':') =>
        {
            cmd
        }
        _ => line,
    }
}

fn parse_fish(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| line.strip_prefix("- cmd: "))
        .map(unescape_fish)
        .filter(|cmd| !cmd.trim().is_empty())
        .collect()
}

fn unescape_fish(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn parse_ksh(text: &str) -> Vec<String> {
    // ksh93 history is binary-framed; commands are separated by newlines
    // with control bytes around them.
    text.split(|c| c == '\n' || c == '\0')
        .map(|line| {
            line.chars()
                .filter(|&c| (!c.is_control() || c == '\t') && c != char::REPLACEMENT_CHARACTER)
                .collect::<String>()
        })
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

/// Read and parse the shell's history file.
pub fn read_local_history(env: &ShellEnvironment) -> Result<CommandHistory, HistoryError> {
    match fs::read(&env.history_path) {
        Ok(bytes) => Ok(parse_history(env.kind, &bytes)),
        Err(source) => {
            tracing::error!(
                path = %env.history_path.display(),
                error = %source,
                "failed to read shell history"
            );
            Err(HistoryError::Read {
                path: env.history_path.clone(),
                source,
            })
        }
    }
}

/// History of lines entered in the interactive shell.
///
/// Bounded, skips blank lines and consecutive duplicates, and is appended
/// to a file so it survives restarts. The file is rewritten down to the
/// retained entries on open and whenever it grows past twice the bound.
pub struct SessionHistory {
    entries: VecDeque<String>,
    max_entries: usize,
    path: Option<PathBuf>,
    stored_lines: usize,
}

impl SessionHistory {
    /// In-memory only.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries: max_entries.max(1),
            path: None,
            stored_lines: 0,
        }
    }

    /// Load from `path` (missing file is fine) and persist new entries there.
    pub fn open(path: &Path, max_entries: usize) -> io::Result<Self> {
        let mut history = Self::new(max_entries);
        match fs::read_to_string(path) {
            Ok(contents) => {
                for line in contents.lines() {
                    history.stored_lines += 1;
                    history.push_memory(line);
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        history.path = Some(path.to_path_buf());
        if history.stored_lines > history.entries.len() {
            history.compact();
        }
        Ok(history)
    }

    /// Record a line. Returns whether it was added.
    pub fn add(&mut self, line: &str) -> bool {
        if !self.push_memory(line) {
            return false;
        }
        if let Some(ref path) = self.path {
            match append_line(path, line.trim()) {
                Ok(()) => self.stored_lines += 1,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to persist history");
                }
            }
        }
        if self.stored_lines > self.max_entries.saturating_mul(2) {
            self.compact();
        }
        true
    }

    /// Rewrite the file with only the retained entries.
    fn compact(&mut self) {
        let Some(ref path) = self.path else {
            return;
        };
        let mut text = String::new();
        for entry in &self.entries {
            text.push_str(entry);
            text.push('\n');
        }
        match write_atomic(path, text.as_bytes()) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), kept = self.entries.len(), "compacted history");
                self.stored_lines = self.entries.len();
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to compact history");
            }
        }
    }

    fn push_memory(&mut self, line: &str) -> bool {
        let line = line.trim();
        if line.is_empty() || self.entries.back().is_some_and(|last| last == line) {
            return false;
        }
        self.entries.push_back(line.to_string());
        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn snapshot(&self) -> CommandHistory {
        CommandHistory::new(self.entries.iter().cloned().collect())
    }
}

fn append_line(path: &Path, line: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")
}
