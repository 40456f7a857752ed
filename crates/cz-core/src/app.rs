//! Everything a command needs, built once per process.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::ai::AiService;
use crate::capture::CaptureStore;
use crate::config::Config;
use crate::error::CoreError;
use crate::history::{read_local_history, SessionHistory};
use crate::metrics::Metrics;
use crate::shell::{ShellEnvironment, ShellError};
use crate::style::Style;

const DEFAULT_NAME: &str = "cmdzen";

pub struct App {
    pub config: Config,
    /// Detection result; commands that need a shell report the error.
    pub shell: Result<ShellEnvironment, ShellError>,
    pub capture: CaptureStore,
    pub metrics: Arc<Metrics>,
    pub session: SessionHistory,
    pub style: Style,
    exe: PathBuf,
    /// Built on first use so commands that never ask skip key resolution.
    ai: OnceCell<AiService>,
}

impl App {
    pub fn new(
        config: Config,
        shell: Result<ShellEnvironment, ShellError>,
        session: SessionHistory,
        style: Style,
    ) -> Self {
        let capture = CaptureStore::new(config.capture.resolve_path());
        Self {
            config,
            shell,
            capture,
            metrics: Arc::new(Metrics::new()),
            session,
            style,
            exe: PathBuf::from(DEFAULT_NAME),
            ai: OnceCell::new(),
        }
    }

    /// Detect the shell, open the session history and locate the binary.
    pub fn from_config(config: Config, style: Style) -> Self {
        let shell = ShellEnvironment::detect(config.shell.respect_histfile);

        let history_path = config.repl.resolve_history_path();
        let session = SessionHistory::open(&history_path, config.repl.history_size)
            .unwrap_or_else(|e| {
                tracing::warn!(
                    path = %history_path.display(),
                    error = %e,
                    "failed to load session history"
                );
                SessionHistory::new(config.repl.history_size)
            });

        let exe = std::env::current_exe().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "cannot resolve own executable path");
            PathBuf::from(DEFAULT_NAME)
        });

        Self::new(config, shell, session, style).with_exe(exe)
    }

    pub fn with_ai(mut self, ai: AiService) -> Self {
        self.ai = OnceCell::new_with(Some(ai));
        self
    }

    pub fn with_exe(mut self, exe: impl Into<PathBuf>) -> Self {
        self.exe = exe.into();
        self
    }

    pub fn with_capture(mut self, capture: CaptureStore) -> Self {
        self.capture = capture;
        self
    }

    pub fn exe_path(&self) -> &Path {
        &self.exe
    }

    pub fn shell(&self) -> Result<&ShellEnvironment, CoreError> {
        self.shell.as_ref().map_err(|e| CoreError::Shell(e.clone()))
    }

    pub async fn ai(&self) -> Result<&AiService, CoreError> {
        let ai = self
            .ai
            .get_or_try_init(|| async {
                AiService::from_config(&self.config, self.metrics.clone())
            })
            .await?;
        Ok(ai)
    }

    /// Whether `word`, the first word of a command line, runs cmdzen.
    pub fn is_self_invocation(&self, word: &str) -> bool {
        let basename = word.rsplit('/').next().unwrap_or(word);
        basename == DEFAULT_NAME
            || word == self.config.shell.alias
            || Path::new(word) == self.exe
            || word == "$CMDZEN_PATH"
    }

    /// Most recent history entry that is not a cmdzen invocation.
    pub fn last_history_command(&self) -> Result<Option<String>, CoreError> {
        let history = read_local_history(self.shell()?)?;
        Ok(history
            .last_command(|word| self.is_self_invocation(word))
            .map(str::to_string))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::shell::ShellKind;
    use cz_backend::{ChatBackend, MockBackend};

    /// An app rooted in `home`: bash shell, capture and config under it,
    /// no colors.
    pub fn app_in(home: &Path) -> App {
        let mut config = Config::default();
        config.capture.path = Some(
            home.join("capture")
                .join("last_command")
                .to_string_lossy()
                .into_owned(),
        );
        let shell = Ok(ShellEnvironment::for_kind(ShellKind::Bash, home));
        App::new(config, shell, SessionHistory::new(50), Style::disabled())
            .with_exe("/opt/cmdzen/bin/cmdzen")
    }

    pub fn with_mock_ai(app: App, fallback: MockBackend) -> App {
        let ai = AiService::new(
            None,
            Box::new(fallback) as Box<dyn ChatBackend>,
            app.metrics.clone(),
        );
        app.with_ai(ai)
    }
}
