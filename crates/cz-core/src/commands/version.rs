use std::io::Write;

use crate::error::CoreError;

pub fn version_line() -> String {
    format!("Cmdzen version {}", env!("CARGO_PKG_VERSION"))
}

pub fn run(out: &mut dyn Write) -> Result<(), CoreError> {
    writeln!(out, "{}", version_line())?;
    Ok(())
}
