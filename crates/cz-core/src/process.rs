//! Re-running a command to capture its output.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;

/// Exit code reported when the command ran past the timeout.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RerunOutput {
    pub exit_code: i32,
    /// stdout followed by stderr.
    pub output: String,
    pub timed_out: bool,
}

/// Run `command` through `sh -c`, collecting stdout and stderr.
///
/// stdin is closed so interactive commands cannot hang waiting for input.
/// A command that outlives `timeout` is killed.
pub async fn rerun(command: &str, timeout: Duration) -> std::io::Result<RerunOutput> {
    let mut child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();

    let collect = async {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let read_out = async {
            if let Some(ref mut s) = stdout {
                s.read_to_end(&mut out).await?;
            }
            Ok::<_, std::io::Error>(())
        };
        let read_err = async {
            if let Some(ref mut s) = stderr {
                s.read_to_end(&mut err).await?;
            }
            Ok::<_, std::io::Error>(())
        };
        tokio::try_join!(read_out, read_err)?;
        let status = child.wait().await?;
        Ok::<_, std::io::Error>((status, out, err))
    };

    match tokio::time::timeout(timeout, collect).await {
        Ok(result) => {
            let (status, out, err) = result?;
            let mut output = String::from_utf8_lossy(&out).into_owned();
            output.push_str(&String::from_utf8_lossy(&err));
            // Killed by a signal: report like a shell does.
            let exit_code = status.code().unwrap_or(128);
            Ok(RerunOutput {
                exit_code,
                output,
                timed_out: false,
            })
        }
        Err(_) => {
            tracing::warn!(command, ?timeout, "re-run timed out");
            Ok(RerunOutput {
                exit_code: TIMEOUT_EXIT_CODE,
                output: format!("Command timed out after {}s", timeout.as_secs()),
                timed_out: true,
            })
        }
    }
}
