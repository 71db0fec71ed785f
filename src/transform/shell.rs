//! Filtering text through an external shell command, like Acme's `|cmd`.
//!
//! The command runs under `sh -c`. A non-zero exit is an error carrying the
//! command's stderr.

use std::io::{self, Write};
use std::process::{Command, ExitStatus, Stdio};
use std::string::FromUtf8Error;

#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("running `{command}`")]
    Io {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    Command {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("`{command}` wrote invalid UTF-8")]
    InvalidOutput {
        command: String,
        #[source]
        source: FromUtf8Error,
    },
}

/// Pipes text through `sh -c COMMAND`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellFilter {
    command: String,
}

impl ShellFilter {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Run the command with `input` on stdin and return its stdout.
    ///
    /// # Errors
    /// Returns an error if the command cannot be spawned, exits unsuccessfully,
    /// or writes output that is not UTF-8.
    pub fn run(&self, input: &str) -> Result<String, TransformError> {
        let io_err = |source| TransformError::Io {
            command: self.command.clone(),
            source,
        };

        tracing::debug!(command = %self.command, bytes = input.len(), "piping selection");
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(io_err)?;

        // Feed stdin from another thread so a command that writes before it
        // finishes reading cannot fill the stdout pipe and deadlock.
        let stdin = child.stdin.take();
        let input = input.to_owned();
        let writer = std::thread::spawn(move || -> io::Result<()> {
            let Some(mut stdin) = stdin else {
                return Ok(());
            };
            match stdin.write_all(input.as_bytes()) {
                Err(err) if err.kind() == io::ErrorKind::BrokenPipe => Ok(()),
                other => other,
            }
        });

        let output = child.wait_with_output().map_err(io_err)?;
        writer
            .join()
            .unwrap_or_else(|_| Err(io::Error::other("stdin writer panicked")))
            .map_err(io_err)?;

        if !output.status.success() {
            return Err(TransformError::Command {
                command: self.command.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        String::from_utf8(output.stdout).map_err(|source| TransformError::InvalidOutput {
            command: self.command.clone(),
            source,
        })
    }
}
