//! Login shell detection and per-shell file locations.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellKind {
    Bash,
    Zsh,
    Fish,
    Ksh,
}

impl ShellKind {
    pub fn name(self) -> &'static str {
        match self {
            ShellKind::Bash => "bash",
            ShellKind::Zsh => "zsh",
            ShellKind::Fish => "fish",
            ShellKind::Ksh => "ksh",
        }
    }

    /// rc file and history file, relative to the home directory.
    fn default_paths(self) -> (&'static str, &'static str) {
        match self {
            ShellKind::Bash => (".bashrc", ".bash_history"),
            ShellKind::Zsh => (".zshrc", ".zsh_history"),
            ShellKind::Fish => (
                ".config/fish/config.fish",
                ".local/share/fish/fish_history",
            ),
            ShellKind::Ksh => (".kshrc", ".ksh_history"),
        }
    }

    /// Whether the shell reads `$HISTFILE` for its history location.
    fn uses_histfile(self) -> bool {
        !matches!(self, ShellKind::Fish)
    }
}

impl fmt::Display for ShellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ShellError {
    #[error("SHELL environment variable is not set.")]
    VariableMissing,
    #[error("Unsupported shell detected: {0}. Create an issue on GitHub.")]
    Unsupported(String),
}

pub fn detect_shell(cmd: &str) -> Option<ShellKind> {
    // Extract the basename from the command path
    let basename = cmd.rsplit('/').next().unwrap_or(cmd);
    // Strip leading dash (login shell convention)
    let name = basename.strip_prefix('-').unwrap_or(basename);
    match name {
        "bash" => return Some(ShellKind::Bash),
        "zsh" => return Some(ShellKind::Zsh),
        "fish" => return Some(ShellKind::Fish),
        "ksh" | "ksh93" | "mksh" | "pdksh" => return Some(ShellKind::Ksh),
        _ => {}
    }

    // Versioned or wrapped names, e.g. "bash-5.2" or "zsh-static".
    [
        ShellKind::Bash,
        ShellKind::Zsh,
        ShellKind::Fish,
        ShellKind::Ksh,
    ]
    .into_iter()
    .find(|kind| name.contains(kind.name()))
}

/// The user's shell and the files cmdzen reads and edits for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellEnvironment {
    pub kind: ShellKind,
    pub config_path: PathBuf,
    pub history_path: PathBuf,
}

impl ShellEnvironment {
    /// Detect from `$SHELL`, `$HOME` and, if `respect_histfile`, `$HISTFILE`.
    pub fn detect(respect_histfile: bool) -> Result<Self, ShellError> {
        Self::detect_from(|name| std::env::var(name).ok(), respect_histfile)
    }

    pub fn detect_from(
        lookup: impl Fn(&str) -> Option<String>,
        respect_histfile: bool,
    ) -> Result<Self, ShellError> {
        let shell = lookup("SHELL")
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| {
                tracing::error!("environment variable SHELL is not set");
                ShellError::VariableMissing
            })?;

        let kind = detect_shell(shell.trim()).ok_or_else(|| {
            tracing::warn!(shell = %shell, "unsupported shell detected");
            ShellError::Unsupported(shell.clone())
        })?;

        let home = lookup("HOME").unwrap_or_else(|| ".".to_string());
        let mut env = Self::for_kind(kind, Path::new(&home));

        if respect_histfile && kind.uses_histfile() {
            if let Some(histfile) = lookup("HISTFILE").filter(|h| !h.is_empty()) {
                env.history_path = PathBuf::from(histfile);
            }
        }

        tracing::debug!(
            shell = %kind,
            config = %env.config_path.display(),
            history = %env.history_path.display(),
            "shell environment detected"
        );
        Ok(env)
    }

    pub fn for_kind(kind: ShellKind, home: &Path) -> Self {
        let (config, history) = kind.default_paths();
        Self {
            kind,
            config_path: home.join(config),
            history_path: home.join(history),
        }
    }

    pub fn shell_name(&self) -> &'static str {
        self.kind.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn detect_shells() {
        assert_eq!(detect_shell("/bin/bash"), Some(ShellKind::Bash));
        assert_eq!(detect_shell("/usr/bin/zsh"), Some(ShellKind::Zsh));
        assert_eq!(detect_shell("/usr/local/bin/fish"), Some(ShellKind::Fish));
        assert_eq!(detect_shell("/bin/ksh93"), Some(ShellKind::Ksh));
        assert_eq!(detect_shell("/bin/mksh"), Some(ShellKind::Ksh));
        assert_eq!(detect_shell("-zsh"), Some(ShellKind::Zsh));
        assert_eq!(detect_shell("bash"), Some(ShellKind::Bash));
        assert_eq!(detect_shell("/bin/sh"), None);
        assert_eq!(detect_shell("/usr/bin/nu"), None);
    }

    #[test]
    fn detect_versioned_names() {
        assert_eq!(detect_shell("/opt/bin/bash-5.2"), Some(ShellKind::Bash));
        assert_eq!(detect_shell("/bin/zsh-static"), Some(ShellKind::Zsh));
    }

    #[test]
    fn paths_per_shell() {
        let home = Path::new("/home/ada");
        let bash = ShellEnvironment::for_kind(ShellKind::Bash, home);
        assert_eq!(bash.config_path, PathBuf::from("/home/ada/.bashrc"));
        assert_eq!(bash.history_path, PathBuf::from("/home/ada/.bash_history"));

        let zsh = ShellEnvironment::for_kind(ShellKind::Zsh, home);
        assert_eq!(zsh.config_path, PathBuf::from("/home/ada/.zshrc"));
        assert_eq!(zsh.history_path, PathBuf::from("/home/ada/.zsh_history"));

        let fish = ShellEnvironment::for_kind(ShellKind::Fish, home);
        assert_eq!(
            fish.config_path,
            PathBuf::from("/home/ada/.config/fish/config.fish")
        );
        assert_eq!(
            fish.history_path,
            PathBuf::from("/home/ada/.local/share/fish/fish_history")
        );

        let ksh = ShellEnvironment::for_kind(ShellKind::Ksh, home);
        assert_eq!(ksh.config_path, PathBuf::from("/home/ada/.kshrc"));
        assert_eq!(ksh.history_path, PathBuf::from("/home/ada/.ksh_history"));
    }

    #[test]
    fn detect_from_env() {
        let env =
            ShellEnvironment::detect_from(env_of(&[("SHELL", "/bin/zsh"), ("HOME", "/h")]), true)
                .unwrap();
        assert_eq!(env.kind, ShellKind::Zsh);
        assert_eq!(env.shell_name(), "zsh");
        assert_eq!(env.config_path, PathBuf::from("/h/.zshrc"));
    }

    #[test]
    fn missing_shell_variable() {
        let err = ShellEnvironment::detect_from(env_of(&[("HOME", "/h")]), true).unwrap_err();
        assert_eq!(err, ShellError::VariableMissing);

        let err =
            ShellEnvironment::detect_from(env_of(&[("SHELL", ""), ("HOME", "/h")]), true)
                .unwrap_err();
        assert_eq!(err, ShellError::VariableMissing);
    }

    #[test]
    fn unsupported_shell() {
        let err = ShellEnvironment::detect_from(env_of(&[("SHELL", "/usr/bin/nu")]), true)
            .unwrap_err();
        assert_eq!(err, ShellError::Unsupported("/usr/bin/nu".to_string()));
        assert!(err.to_string().contains("Create an issue"));
    }

    #[test]
    fn histfile_override() {
        let vars = [
            ("SHELL", "/bin/bash"),
            ("HOME", "/h"),
            ("HISTFILE", "/data/bash_hist"),
        ];
        let env = ShellEnvironment::detect_from(env_of(&vars), true).unwrap();
        assert_eq!(env.history_path, PathBuf::from("/data/bash_hist"));

        let env = ShellEnvironment::detect_from(env_of(&vars), false).unwrap();
        assert_eq!(env.history_path, PathBuf::from("/h/.bash_history"));
    }

    #[test]
    fn fish_ignores_histfile() {
        let vars = [
            ("SHELL", "/usr/bin/fish"),
            ("HOME", "/h"),
            ("HISTFILE", "/data/whatever"),
        ];
        let env = ShellEnvironment::detect_from(env_of(&vars), true).unwrap();
        assert_eq!(
            env.history_path,
            PathBuf::from("/h/.local/share/fish/fish_history")
        );
    }
}
