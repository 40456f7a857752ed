use std::io::Write;

use crate::app::App;
use crate::error::CoreError;

pub fn run(app: &App, out: &mut dyn Write) -> Result<(), CoreError> {
    out.write_all(app.metrics.render().as_bytes())?;
    Ok(())
}
