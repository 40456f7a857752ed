//! Shell integration block installed into the user's rc file.
//!
//! The block exports `CMDZEN_PATH`, defines the alias that runs cmdzen,
//! and installs a hook that writes the capture file whenever a command
//! exits non-zero. It is delimited by marker lines so it can be replaced
//! or removed without touching the rest of the file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::fsutil::write_atomic;
use crate::shell::{ShellEnvironment, ShellKind};

pub const BEGIN_MARKER: &str = "# CmdZen integration";
pub const END_MARKER: &str = "# End CmdZen integration";

const ALIAS_TARGET: &str = "\"$CMDZEN_PATH\"";

#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("failed to access {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("{0} has a CmdZen integration block without an end marker; remove it manually")]
    Unterminated(PathBuf),
    #[error("invalid alias '{0}': use letters, digits, '_', '.' or '-'")]
    InvalidAlias(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectOutcome {
    Installed,
    Updated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationStatus {
    ConfigMissing,
    Installed,
    NotInstalled,
}

// Hooks record the command line, exit code and time of every failed
// command. Invocations of cmdzen itself (by path, default name, or any
// alias pointing at $CMDZEN_PATH) are skipped so `solve` keeps seeing the
// user's failure.

// bash 4.4+ expands PS0 once for every command read at the prompt and never
// for an empty line; the arithmetic in it arms the flag the precmd consumes.
const BASH_HOOK: &str = r#"__cmdzen_capture_file=@CAPTURE_FILE@
__cmdzen_armed=
__cmdzen_precmd() {
    local exit_code=$?
    [ -n "$__cmdzen_armed" ] || return "$exit_code"
    __cmdzen_armed=
    [ "$exit_code" -eq 0 ] && return 0
    local entry cmd first re='^[[:space:]]*[0-9]+[* ] (.*)$'
    entry=$(HISTTIMEFORMAT= builtin history 1)
    [[ $entry =~ $re ]] || return "$exit_code"
    cmd=${BASH_REMATCH[1]}
    [ -z "$cmd" ] && return "$exit_code"
    first=${cmd%%[[:space:]]*}
    case "$first" in
        "$CMDZEN_PATH"|cmdzen) return "$exit_code" ;;
    esac
    case "$(builtin alias -- "$first" 2>/dev/null)" in
        *"$CMDZEN_PATH"*) return "$exit_code" ;;
    esac
    cmd=${cmd//$'\n'/ }
    mkdir -p "$(dirname "$__cmdzen_capture_file")"
    {
        printf '__CMDZEN_CMD_START__\n'
        printf 'COMMAND: %s\n' "$cmd"
        printf 'EXIT_CODE: %d\n' "$exit_code"
        printf 'TIMESTAMP: %s\n' "$(date '+%Y-%m-%dT%H:%M:%S%z')"
    } >| "$__cmdzen_capture_file"
    return "$exit_code"
}
case "$PS0" in
    *__cmdzen_armed*) ;;
    *) PS0="${PS0}"'${__cmdzen_armed:$((__cmdzen_armed=1)):0}' ;;
esac
case ";${PROMPT_COMMAND[*]};" in
    *";__cmdzen_precmd;"*) ;;
    *) PROMPT_COMMAND="__cmdzen_precmd${PROMPT_COMMAND:+;$PROMPT_COMMAND}" ;;
esac
"#;

const ZSH_HOOK: &str = r#"__cmdzen_capture_file=@CAPTURE_FILE@
__cmdzen_preexec() {
    __cmdzen_last_cmd="$1"
}
__cmdzen_precmd() {
    local exit_code=$?
    local cmd="$__cmdzen_last_cmd"
    __cmdzen_last_cmd=""
    [[ $exit_code -eq 0 || -z "$cmd" ]] && return
    local first=${cmd%% *}
    [[ "$first" == "$CMDZEN_PATH" || "$first" == cmdzen ]] && return
    [[ "$(alias -- "$first" 2>/dev/null)" == *"$CMDZEN_PATH"* ]] && return
    cmd=${cmd//$'\n'/ }
    mkdir -p "${__cmdzen_capture_file:h}"
    {
        print -r -- '__CMDZEN_CMD_START__'
        print -r -- "COMMAND: $cmd"
        print -r -- "EXIT_CODE: $exit_code"
        print -r -- "TIMESTAMP: $(date '+%Y-%m-%dT%H:%M:%S%z')"
    } >| "$__cmdzen_capture_file"
}
autoload -Uz add-zsh-hook
add-zsh-hook preexec __cmdzen_preexec
add-zsh-hook precmd __cmdzen_precmd
"#;

const FISH_HOOK: &str = r#"set -g __cmdzen_capture_file @CAPTURE_FILE@
function __cmdzen_postexec --on-event fish_postexec
    set -l exit_code $status
    test $exit_code -eq 0; and return
    set -l cmd (string join ' ' -- $argv[1] | string replace -a \n ' ')
    test -z "$cmd"; and return
    set -l first (string split -m1 ' ' -- $cmd)[1]
    if test "$first" = "$CMDZEN_PATH"; or test "$first" = cmdzen
        return
    end
    if functions -q -- $first; and string match -q -- "*$CMDZEN_PATH*" (functions -- $first | string collect)
        return
    end
    mkdir -p (dirname -- $__cmdzen_capture_file)
    begin
        echo '__CMDZEN_CMD_START__'
        echo "COMMAND: $cmd"
        echo "EXIT_CODE: $exit_code"
        echo "TIMESTAMP: "(date '+%Y-%m-%dT%H:%M:%S%z')
    end >$__cmdzen_capture_file
end
"#;

/// Render the full integration block, markers included.
pub fn integration_script(kind: ShellKind, exe: &Path, capture_file: &Path, alias: &str) -> String {
    let exe = exe.to_string_lossy();
    let capture = capture_file.to_string_lossy();

    let (export, hook) = match kind {
        ShellKind::Fish => (
            format!("set -gx CMDZEN_PATH {}", fish_quote(&exe)),
            Some(FISH_HOOK.replace("@CAPTURE_FILE@", &fish_quote(&capture))),
        ),
        ShellKind::Bash => (
            format!("export CMDZEN_PATH={}", sh_quote(&exe)),
            Some(BASH_HOOK.replace("@CAPTURE_FILE@", &sh_quote(&capture))),
        ),
        ShellKind::Zsh => (
            format!("export CMDZEN_PATH={}", sh_quote(&exe)),
            Some(ZSH_HOOK.replace("@CAPTURE_FILE@", &sh_quote(&capture))),
        ),
        // ksh has no portable pre/post command hooks; alias only.
        ShellKind::Ksh => (format!("export CMDZEN_PATH={}", sh_quote(&exe)), None),
    };

    let mut block = String::new();
    block.push_str(BEGIN_MARKER);
    block.push('\n');
    block.push_str(&export);
    block.push('\n');
    block.push_str(&alias_line(alias));
    block.push('\n');
    if let Some(hook) = hook {
        block.push_str(&hook);
    }
    block.push_str(END_MARKER);
    block.push('\n');
    block
}

/// Whether the shell's integration hook records failed commands.
pub fn captures_failures(kind: ShellKind) -> bool {
    !matches!(kind, ShellKind::Ksh)
}

fn alias_line(alias: &str) -> String {
    format!("alias {alias}={ALIAS_TARGET}")
}

/// POSIX single-quote a string.
fn sh_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// fish single-quote a string (backslash and quote are escapable inside).
fn fish_quote(s: &str) -> String {
    format!("'{}'", s.replace('\\', r"\\").replace('\'', r"\'"))
}

pub fn validate_alias(alias: &str) -> Result<(), IntegrationError> {
    let valid = !alias.is_empty()
        && alias
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        && !alias.starts_with('-');
    if valid {
        Ok(())
    } else {
        Err(IntegrationError::InvalidAlias(alias.to_string()))
    }
}

/// Whether `config_text` has a begin marker line, the same test `inject`
/// and `remove` use to locate the block.
pub fn is_installed(config_text: &str) -> bool {
    let lines: Vec<&str> = config_text.lines().collect();
    find_block(&lines).is_some()
}

/// Line range `[begin, end]` of the block, if present.
fn find_block(lines: &[&str]) -> Option<(usize, Option<usize>)> {
    let begin = lines.iter().position(|l| l.trim() == BEGIN_MARKER)?;
    let end = lines[begin..]
        .iter()
        .position(|l| l.trim() == END_MARKER)
        .map(|offset| begin + offset);
    Some((begin, end))
}

/// Insert `block` into `text`, replacing an existing block in place.
/// Returns `Err(())` when an existing block has no end marker.
fn upsert_block(text: &str, block: &str) -> Result<(String, InjectOutcome), ()> {
    let lines: Vec<&str> = text.lines().collect();

    match find_block(&lines) {
        Some((begin, Some(end))) => {
            let mut out = String::new();
            for line in &lines[..begin] {
                out.push_str(line);
                out.push('\n');
            }
            out.push_str(block);
            for line in &lines[end + 1..] {
                out.push_str(line);
                out.push('\n');
            }
            Ok((out, InjectOutcome::Updated))
        }
        Some((_, None)) => Err(()),
        None => {
            let mut out = text.to_string();
            if !out.is_empty() {
                if !out.ends_with('\n') {
                    out.push('\n');
                }
                out.push('\n');
            }
            out.push_str(block);
            Ok((out, InjectOutcome::Installed))
        }
    }
}

/// Remove the block and the blank line that separated it, if any.
fn remove_block(text: &str) -> Result<Option<String>, ()> {
    let lines: Vec<&str> = text.lines().collect();
    let (begin, end) = match find_block(&lines) {
        None => return Ok(None),
        Some((_, None)) => return Err(()),
        Some((begin, Some(end))) => (begin, end),
    };

    let keep_until = if begin > 0 && lines[begin - 1].trim().is_empty() {
        begin - 1
    } else {
        begin
    };

    let mut out = String::new();
    for line in lines[..keep_until].iter().chain(&lines[end + 1..]) {
        out.push_str(line);
        out.push('\n');
    }
    Ok(Some(out))
}

fn read_optional(path: &Path) -> Result<Option<String>, IntegrationError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(IntegrationError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

pub(crate) fn write_config(path: &Path, text: &str) -> Result<(), IntegrationError> {
    let io_err = |source| IntegrationError::Io {
        path: path.to_path_buf(),
        source,
    };
    write_atomic(path, text.as_bytes()).map_err(io_err)
}

/// Install or refresh the block in the shell's rc file.
pub fn inject(env: &ShellEnvironment, block: &str) -> Result<InjectOutcome, IntegrationError> {
    let path = &env.config_path;
    let current = read_optional(path)?.unwrap_or_default();
    let (updated, outcome) =
        upsert_block(&current, block).map_err(|_| IntegrationError::Unterminated(path.clone()))?;
    write_config(path, &updated)?;
    tracing::info!(path = %path.display(), ?outcome, "shell integration written");
    Ok(outcome)
}

/// Remove the block. Returns `false` when none was installed.
pub fn remove(env: &ShellEnvironment) -> Result<bool, IntegrationError> {
    let path = &env.config_path;
    let Some(current) = read_optional(path)? else {
        return Ok(false);
    };
    match remove_block(&current) {
        Ok(Some(updated)) => {
            write_config(path, &updated)?;
            tracing::info!(path = %path.display(), "shell integration removed");
            Ok(true)
        }
        Ok(None) => Ok(false),
        Err(()) => Err(IntegrationError::Unterminated(path.clone())),
    }
}

pub fn status(env: &ShellEnvironment) -> Result<IntegrationStatus, IntegrationError> {
    Ok(match read_optional(&env.config_path)? {
        None => IntegrationStatus::ConfigMissing,
        Some(text) if is_installed(&text) => IntegrationStatus::Installed,
        Some(_) => IntegrationStatus::NotInstalled,
    })
}

/// Point the first `alias ...="$CMDZEN_PATH"` line at a new alias name.
/// Returns `None` when no such line exists.
pub fn rewrite_alias(text: &str, new_alias: &str) -> Option<String> {
    let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
    let idx = lines.iter().position(|line| {
        let trimmed = line.trim();
        trimmed.starts_with("alias ") && trimmed.contains(ALIAS_TARGET)
    })?;
    lines[idx] = alias_line(new_alias);

    let mut out = lines.join("\n");
    if text.ends_with('\n') {
        out.push('\n');
    }
    Some(out)
}
