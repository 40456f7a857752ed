use std::io::{self, IsTerminal};
use std::path::Path;

use clap::Parser;
use cz_core::app::App;
use cz_core::cli::{Cli, Command};
use cz_core::commands::{dispatch, help};
use cz_core::config::Config;
use cz_core::logging;
use cz_core::repl::run_repl;
use cz_core::style::Style;

fn main() {
    let cli = Cli::parse();

    let (mut config, config_error) = Config::load_or_default(cli.config.as_deref());
    config.apply_env();
    logging::init(cli.verbose, &config.logging.level);
    if let Some(e) = config_error {
        tracing::warn!(error = %e, "using default configuration");
    }

    let export_path = config.metrics.export_path.clone();
    let mut app = App::from_config(config, Style::from_flag(cli.no_color));

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to create async runtime: {e}");
            std::process::exit(1);
        }
    };

    let interactive = match cli.command {
        Some(Command::Shell) => true,
        None => io::stdin().is_terminal(),
        Some(_) => false,
    };

    let code = if interactive {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let stdout = io::stdout();
        let mut out = stdout.lock();
        match run_repl(&mut app, runtime.handle(), &mut input, &mut out) {
            Ok(()) => 0,
            Err(e) => {
                eprintln!("error: {e}");
                1
            }
        }
    } else {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        let result = match cli.command {
            Some(ref command) => runtime.block_on(dispatch(&app, command, &mut out)),
            // Piped stdin and no command: there is nobody to talk to.
            None => help::run(&mut out),
        };
        match result {
            Ok(()) => 0,
            Err(e) => {
                tracing::debug!(error = ?e, "command failed");
                eprintln!("{}", app.style.red(&format!("error: {e}")));
                1
            }
        }
    };

    if let Some(path) = export_path {
        if let Err(e) = app.metrics.export(Path::new(&path)) {
            tracing::warn!(path = %path, error = %e, "failed to export metrics");
        }
    }

    std::process::exit(code);
}
