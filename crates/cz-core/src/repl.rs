//! Interactive shell: read a line, parse it like command-line arguments,
//! dispatch, repeat.

use std::io::{self, BufRead, Write};

use clap::Parser;
use thiserror::Error;
use tokio::runtime::Handle;

use crate::app::App;
use crate::cli::Cli;
use crate::commands::dispatch;

pub const PROMPT: &str = "cmdzen:> ";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenizeError {
    #[error("unterminated {0} quote")]
    UnterminatedQuote(char),
}

/// Split a line into words, honoring single quotes, double quotes and
/// backslash escapes the way a POSIX shell does.
pub fn tokenize(line: &str) -> Result<Vec<String>, TokenizeError> {
    let mut words = Vec::new();
    let mut current = String::new();
    // Distinguishes `""` (an empty word) from no word at all.
    let mut in_word = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => current.push(c),
                        None => return Err(TokenizeError::UnterminatedQuote('\'')),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(e @ ('"' | '\\' | '$' | '`')) => current.push(e),
                            Some(other) => {
                                current.push('\\');
                                current.push(other);
                            }
                            None => return Err(TokenizeError::UnterminatedQuote('"')),
                        },
                        Some(c) => current.push(c),
                        None => return Err(TokenizeError::UnterminatedQuote('"')),
                    }
                }
            }
            '\\' => {
                in_word = true;
                match chars.next() {
                    Some(escaped) => current.push(escaped),
                    None => current.push('\\'),
                }
            }
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }

    if in_word {
        words.push(current);
    }
    Ok(words)
}

/// Run the interactive loop until `exit`, `quit` or end of input.
pub fn run_repl(
    app: &mut App,
    rt_handle: &Handle,
    input: &mut dyn BufRead,
    out: &mut dyn Write,
) -> io::Result<()> {
    writeln!(
        out,
        "CmdZen interactive shell. Type 'help' for commands, 'exit' to quit."
    )?;

    loop {
        write!(out, "{}", app.style.cyan(PROMPT))?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(out)?;
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        app.session.add(line);

        if matches!(line, "exit" | "quit") {
            break;
        }

        let words = match tokenize(line) {
            Ok(words) => words,
            Err(e) => {
                writeln!(out, "{}", app.style.red(&e.to_string()))?;
                continue;
            }
        };

        let cli = match Cli::try_parse_from(
            std::iter::once("cmdzen").chain(words.iter().map(String::as_str)),
        ) {
            Ok(cli) => cli,
            Err(e) => {
                write!(out, "{e}")?;
                continue;
            }
        };

        let Some(command) = cli.command else {
            continue;
        };
        tracing::debug!(command = command.name(), "repl command");

        if let Err(e) = rt_handle.block_on(dispatch(app, &command, out)) {
            writeln!(out, "{}", app.style.red(&e.to_string()))?;
        }
    }

    Ok(())
}
