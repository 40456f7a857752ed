//! Tracing subscriber setup.
//!
//! Logs go to stderr so command output on stdout stays pipeable.

use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;

/// Environment variable holding a full `EnvFilter` directive.
pub const LOG_ENV: &str = "CMDZEN_LOG";

/// Pick the filter directive: `CMDZEN_LOG` wins, then `-v` counts, then the
/// configured level.
pub fn filter_directive(env: Option<&str>, verbosity: u8, configured: &str) -> String {
    if let Some(directive) = env.filter(|d| !d.trim().is_empty()) {
        return directive.to_string();
    }
    match verbosity {
        0 => configured.to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Install the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init(verbosity: u8, configured: &str) {
    let env = std::env::var(LOG_ENV).ok();
    let directive = filter_directive(env.as_deref(), verbosity, configured);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_wins() {
        assert_eq!(
            filter_directive(Some("cz_core=trace"), 2, "warn"),
            "cz_core=trace"
        );
    }

    #[test]
    fn blank_env_is_ignored() {
        assert_eq!(filter_directive(Some("  "), 0, "info"), "info");
    }

    #[test]
    fn verbosity_raises_level() {
        assert_eq!(filter_directive(None, 0, "warn"), "warn");
        assert_eq!(filter_directive(None, 1, "warn"), "debug");
        assert_eq!(filter_directive(None, 3, "warn"), "trace");
    }
}
