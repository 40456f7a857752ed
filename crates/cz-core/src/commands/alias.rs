use std::fs;
use std::io::{self, Write};

use crate::app::App;
use crate::error::CoreError;
use crate::integration::{rewrite_alias, validate_alias, write_config, IntegrationError};

pub fn run(app: &App, new_alias: &str, out: &mut dyn Write) -> Result<(), CoreError> {
    validate_alias(new_alias)?;
    let path = &app.shell()?.config_path;

    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "no config file found");
            writeln!(out, "Configuration file not found: {}", path.display())?;
            return Ok(());
        }
        Err(source) => {
            tracing::error!(path = %path.display(), error = %source, "error reading config file");
            return Err(IntegrationError::Io {
                path: path.clone(),
                source,
            }
            .into());
        }
    };

    match rewrite_alias(&text, new_alias) {
        Some(updated) => {
            write_config(path, &updated)?;
            tracing::info!(alias = new_alias, "alias updated");
            writeln!(
                out,
                "Alias updated to {new_alias}. Please run `source {}` or restart your terminal.",
                path.display()
            )?;
        }
        None => {
            tracing::info!("no matching alias found");
            writeln!(out, "No matching alias found.")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::app_in;

    fn run_to_string(app: &App, alias: &str) -> String {
        let mut out = Vec::new();
        run(app, alias, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn missing_config() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_in(dir.path());
        assert_eq!(
            run_to_string(&app, "cz"),
            format!(
                "Configuration file not found: {}\n",
                dir.path().join(".bashrc").display()
            )
        );
    }

    #[test]
    fn rewrites_alias_line() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_in(dir.path());
        let rc = dir.path().join(".bashrc");
        std::fs::write(&rc, "alias ll='ls -l'\nalias cmdzen=\"$CMDZEN_PATH\"\n").unwrap();

        let text = run_to_string(&app, "cz");
        assert!(text.starts_with("Alias updated to cz. Please run `source "));
        assert_eq!(
            std::fs::read_to_string(&rc).unwrap(),
            "alias ll='ls -l'\nalias cz=\"$CMDZEN_PATH\"\n"
        );
    }

    #[test]
    fn no_matching_alias() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_in(dir.path());
        std::fs::write(dir.path().join(".bashrc"), "export A=1\n").unwrap();
        assert_eq!(run_to_string(&app, "cz"), "No matching alias found.\n");
    }

    #[test]
    fn rejects_invalid_name() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_in(dir.path());
        assert!(run(&app, "rm -rf", &mut Vec::new()).is_err());
    }
}
