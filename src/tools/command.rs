//! Running external programs on behalf of providers.

use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use crate::providers::ProvisionError;

/// Captured result of a finished program.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
    /// Execution duration.
    pub duration: Duration,
}

/// Run a program to completion, failing on a non-zero exit.
///
/// Arguments are passed directly, never through a shell.
pub fn run(program: &str, args: &[String], cwd: Option<&Path>) -> Result<CommandOutput, ProvisionError> {
    let start = Instant::now();
    let rendered = render(program, args);
    tracing::debug!("Running {}", rendered);

    let mut cmd = Command::new(program);
    cmd.args(args);
    if let Some(cwd) = cwd {
        cmd.current_dir(cwd);
    }
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let output = cmd.output().map_err(|e| ProvisionError::CommandFailed {
        command: rendered.clone(),
        code: None,
        stderr: e.to_string(),
    })?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    if !output.status.success() {
        return Err(ProvisionError::CommandFailed {
            command: rendered,
            code: output.status.code(),
            stderr,
        });
    }

    Ok(CommandOutput {
        stdout,
        stderr,
        duration: start.elapsed(),
    })
}

/// Shell-quoted rendering of a command line, for messages.
pub fn render(program: &str, args: &[String]) -> String {
    let mut words = vec![program.to_string()];
    words.extend(args.iter().cloned());
    shell_words::join(words)
}
