use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

use cz_backend::openrouter::{DEFAULT_ENDPOINT, DEFAULT_MODEL};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub openrouter: OpenRouterConfig,
    pub agent: AgentConfig,
    pub shell: ShellConfig,
    pub capture: CaptureConfig,
    pub repl: ReplConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct OpenRouterConfig {
    /// API key. Prefer `api_key_cmd` or `OPENROUTER_API_KEY` over storing it here.
    pub api_key: Option<String>,
    /// Command printing the API key (e.g., "pass show openrouter").
    /// The command is run via `sh -c`.
    pub api_key_cmd: Option<String>,
    /// Chat completions URL.
    pub endpoint: String,
    /// Model to use.
    pub model: String,
    /// Stream answers to the terminal as they arrive.
    pub stream: bool,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_cmd: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            stream: true,
            timeout_secs: 120,
        }
    }
}

impl OpenRouterConfig {
    /// Resolve the API key from api_key_cmd, then api_key, then OPENROUTER_API_KEY.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(cmd) = &self.api_key_cmd {
            match Command::new("sh").arg("-c").arg(cmd).output() {
                Ok(output) if output.status.success() => {
                    let key = String::from_utf8_lossy(&output.stdout).trim().to_string();
                    if !key.is_empty() {
                        return Some(key);
                    }
                }
                Ok(output) => {
                    tracing::warn!(status = %output.status, "api_key_cmd failed");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to run api_key_cmd");
                }
            }
        }

        if let Some(key) = self.api_key.as_ref().filter(|k| !k.is_empty()) {
            return Some(key.clone());
        }

        std::env::var("OPENROUTER_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
    }
}

/// DigitalOcean agent, tried before OpenRouter when configured.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentConfig {
    pub url: Option<String>,
    pub key: Option<String>,
}

impl AgentConfig {
    /// The agent is used only when both URL and key are non-empty.
    pub fn is_enabled(&self) -> bool {
        let set = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        set(&self.url) && set(&self.key)
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShellConfig {
    /// Use `$HISTFILE` instead of the default history path when it is set.
    pub respect_histfile: bool,
    /// Timeout for re-running a failed command in `solve`.
    pub rerun_timeout_secs: u64,
    /// Alias installed by the shell integration.
    pub alias: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            respect_histfile: true,
            rerun_timeout_secs: 30,
            alias: "cmdzen".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct CaptureConfig {
    /// Custom capture file. Defaults to ~/.cache/cmdzen/last_command.
    pub path: Option<String>,
}

impl CaptureConfig {
    /// Resolve the capture file, using the configured path or the XDG default.
    pub fn resolve_path(&self) -> PathBuf {
        if let Some(ref custom) = self.path {
            return PathBuf::from(custom);
        }
        xdg_base("XDG_CACHE_HOME", ".cache")
            .join("cmdzen")
            .join("last_command")
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReplConfig {
    /// Maximum number of entries kept in the interactive history.
    pub history_size: usize,
    /// Custom history file. Defaults to ~/.local/share/cmdzen/history.
    pub history_path: Option<String>,
}

impl Default for ReplConfig {
    fn default() -> Self {
        Self {
            history_size: 500,
            history_path: None,
        }
    }
}

impl ReplConfig {
    pub fn resolve_history_path(&self) -> PathBuf {
        if let Some(ref custom) = self.history_path {
            return PathBuf::from(custom);
        }
        xdg_base("XDG_DATA_HOME", ".local/share")
            .join("cmdzen")
            .join("history")
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log filter when CMDZEN_LOG is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct MetricsConfig {
    /// Write Prometheus text metrics here on exit (node_exporter textfile collector).
    pub export_path: Option<String>,
}

impl Config {
    /// Load from `path`, or from the default location when `None`.
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(config_path);
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Config::default()),
            Err(source) => return Err(ConfigError::Read { path, source }),
        };
        toml::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })
    }

    /// Like [`Config::load`], but falls back to the defaults and hands the
    /// error back so it can be logged once logging is up.
    pub fn load_or_default(path: Option<&Path>) -> (Self, Option<ConfigError>) {
        match Self::load(path) {
            Ok(cfg) => (cfg, None),
            Err(e) => (Config::default(), Some(e)),
        }
    }

    /// Apply environment overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    /// Apply environment overrides using `lookup` for variable access.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(model) = get("OPENROUTER_MODEL") {
            self.openrouter.model = model;
        }
        if let Some(url) = get("DO_AGENT_URL") {
            self.agent.url = Some(url);
        }
        if let Some(key) = get("DO_AGENT_KEY") {
            self.agent.key = Some(key);
        }
    }
}

/// `$var`, or `$HOME/<fallback>` when unset.
fn xdg_base(var: &str, fallback: &str) -> PathBuf {
    std::env::var(var).map(PathBuf::from).unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(fallback)
    })
}

pub fn config_path() -> PathBuf {
    xdg_base("XDG_CONFIG_HOME", ".config")
        .join("cmdzen")
        .join("config.toml")
}
