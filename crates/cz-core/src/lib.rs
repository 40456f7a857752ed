//! cz-core: application logic for CmdZen.
//!
//! Shell detection, history, the capture file written by the shell hooks,
//! the integration block, the AI service and the commands built on them.
//! Exposed as a library for integration testing.

pub mod ai;
pub mod app;
pub mod capture;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod fsutil;
pub mod history;
pub mod integration;
pub mod logging;
pub mod metrics;
pub mod process;
pub mod prompt;
pub mod repl;
pub mod shell;
pub mod style;
