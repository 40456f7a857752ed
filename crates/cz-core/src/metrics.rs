//! Process metrics with Prometheus text exposition.
//!
//! Counters are cheap atomics or small maps behind a mutex. They are read
//! by the `metrics` command and, when configured, written to a textfile for
//! node_exporter at exit.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::fsutil::write_atomic;

#[derive(Debug, Default)]
pub struct Metrics {
    commands: Mutex<BTreeMap<String, u64>>,
    ai_requests: Mutex<BTreeMap<String, u64>>,
    ai_failures: Mutex<BTreeMap<String, u64>>,
    ai_fallbacks: AtomicU64,
    /// Total AI request time in microseconds.
    ai_latency_micros: AtomicU64,
    ai_latency_count: AtomicU64,
}

fn bump(map: &Mutex<BTreeMap<String, u64>>, key: &str) {
    let mut map = map.lock().unwrap_or_else(|e| e.into_inner());
    *map.entry(key.to_string()).or_insert(0) += 1;
}

fn read(map: &Mutex<BTreeMap<String, u64>>) -> BTreeMap<String, u64> {
    map.lock().unwrap_or_else(|e| e.into_inner()).clone()
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_command(&self, name: &str) {
        bump(&self.commands, name);
    }

    pub fn record_ai_request(&self, backend: &str, elapsed: Duration) {
        bump(&self.ai_requests, backend);
        self.ai_latency_micros
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
        self.ai_latency_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ai_failure(&self, backend: &str) {
        bump(&self.ai_failures, backend);
    }

    pub fn record_fallback(&self) {
        self.ai_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn command_count(&self, name: &str) -> u64 {
        read(&self.commands).get(name).copied().unwrap_or(0)
    }

    pub fn ai_request_count(&self, backend: &str) -> u64 {
        read(&self.ai_requests).get(backend).copied().unwrap_or(0)
    }

    pub fn ai_failure_count(&self, backend: &str) -> u64 {
        read(&self.ai_failures).get(backend).copied().unwrap_or(0)
    }

    pub fn fallback_count(&self) -> u64 {
        self.ai_fallbacks.load(Ordering::Relaxed)
    }

    /// Render all metrics in the Prometheus text format (version 0.0.4).
    pub fn render(&self) -> String {
        let mut out = String::new();

        write_labeled(
            &mut out,
            "cmdzen_commands_total",
            "Commands dispatched, by command name.",
            "command",
            &read(&self.commands),
        );
        write_labeled(
            &mut out,
            "cmdzen_ai_requests_total",
            "AI requests sent, by backend.",
            "backend",
            &read(&self.ai_requests),
        );
        write_labeled(
            &mut out,
            "cmdzen_ai_failures_total",
            "AI requests that failed, by backend.",
            "backend",
            &read(&self.ai_failures),
        );

        let _ = writeln!(
            out,
            "# HELP cmdzen_ai_fallbacks_total Answers served by the fallback backend."
        );
        let _ = writeln!(out, "# TYPE cmdzen_ai_fallbacks_total counter");
        let _ = writeln!(out, "cmdzen_ai_fallbacks_total {}", self.fallback_count());

        let micros = self.ai_latency_micros.load(Ordering::Relaxed);
        let count = self.ai_latency_count.load(Ordering::Relaxed);
        let _ = writeln!(
            out,
            "# HELP cmdzen_ai_request_seconds Time spent waiting for AI answers."
        );
        let _ = writeln!(out, "# TYPE cmdzen_ai_request_seconds summary");
        let _ = writeln!(
            out,
            "cmdzen_ai_request_seconds_sum {}",
            micros as f64 / 1_000_000.0
        );
        let _ = writeln!(out, "cmdzen_ai_request_seconds_count {count}");

        out
    }

    /// Write the rendered metrics to `path` atomically, so a collector never
    /// reads a half-written file.
    pub fn export(&self, path: &Path) -> io::Result<()> {
        write_atomic(path, self.render().as_bytes())
    }
}

fn write_labeled(
    out: &mut String,
    name: &str,
    help: &str,
    label: &str,
    values: &BTreeMap<String, u64>,
) {
    let _ = writeln!(out, "# HELP {name} {help}");
    let _ = writeln!(out, "# TYPE {name} counter");
    for (value, count) in values {
        let _ = writeln!(out, "{name}{{{label}=\"{}\"}} {count}", escape_label(value));
    }
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_render_has_headers_and_zeroes() {
        let text = Metrics::new().render();
        assert!(text.contains("# TYPE cmdzen_commands_total counter"));
        assert!(text.contains("cmdzen_ai_fallbacks_total 0"));
        assert!(text.contains("cmdzen_ai_request_seconds_count 0"));
        assert!(!text.contains("cmdzen_commands_total{"));
    }

    #[test]
    fn labeled_counters_sorted() {
        let m = Metrics::new();
        m.record_command("solve");
        m.record_command("help");
        m.record_command("solve");

        let text = m.render();
        let help = text.find("cmdzen_commands_total{command=\"help\"} 1").unwrap();
        let solve = text.find("cmdzen_commands_total{command=\"solve\"} 2").unwrap();
        assert!(help < solve);
        assert_eq!(m.command_count("solve"), 2);
        assert_eq!(m.command_count("alias"), 0);
    }

    #[test]
    fn ai_counters_and_summary() {
        let m = Metrics::new();
        m.record_ai_request("agent", Duration::from_millis(1500));
        m.record_ai_failure("agent");
        m.record_fallback();
        m.record_ai_request("openrouter", Duration::from_millis(500));

        let text = m.render();
        assert!(text.contains("cmdzen_ai_requests_total{backend=\"agent\"} 1"));
        assert!(text.contains("cmdzen_ai_requests_total{backend=\"openrouter\"} 1"));
        assert!(text.contains("cmdzen_ai_failures_total{backend=\"agent\"} 1"));
        assert!(text.contains("cmdzen_ai_fallbacks_total 1"));
        assert!(text.contains("cmdzen_ai_request_seconds_sum 2\n"));
        assert!(text.contains("cmdzen_ai_request_seconds_count 2"));
    }

    #[test]
    fn label_values_escaped() {
        let m = Metrics::new();
        m.record_command("we\"ird");
        assert!(m
            .render()
            .contains("cmdzen_commands_total{command=\"we\\\"ird\"} 1"));
    }

    #[test]
    fn export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("textfile").join("cmdzen.prom");
        let m = Metrics::new();
        m.record_command("version");
        m.export(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, m.render());
        assert!(!dir.path().join("textfile").join("cmdzen.prom.tmp").exists());
    }
}
