//! External process execution.
//!
//! The hypervisor, the disk-image tool and the registry search command are
//! all plain programs. Workflows describe what to run as an [`Invocation`]
//! and hand it to a [`ProcessRunner`]; the console uses [`SystemRunner`],
//! tests substitute a recording fake.
//!
//! Arguments are passed as a vector and never through a shell, so paths
//! with spaces or quotes reach the program unchanged.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends a path argument.
    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy().into_owned())
    }

    /// Returns true if `flag` is immediately followed by `value`.
    pub fn has_pair(&self, flag: &str, value: &str) -> bool {
        self.args
            .windows(2)
            .any(|pair| pair[0] == flag && pair[1] == value)
    }

    /// Program name for messages.
    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }
}

impl std::fmt::Display for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {:?}", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` if terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    /// Returns true if the process exited with code 0.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    fn status_text(&self) -> String {
        match self.exit_code {
            Some(code) => format!("exit code {}", code),
            None => "a signal".to_string(),
        }
    }
}

/// Runs external programs to completion.
pub trait ProcessRunner: Send + Sync {
    /// Runs `invocation`, blocking until it exits.
    ///
    /// Returns `Err` only when the program cannot be launched; a non-zero
    /// exit is reported through [`ProcessOutput::exit_code`].
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput>;
}

/// Runs `invocation` and turns a non-zero exit into [`Error::CommandFailed`].
pub fn run_checked(runner: &dyn ProcessRunner, invocation: &Invocation) -> Result<ProcessOutput> {
    let output = runner.run(invocation)?;
    if output.success() {
        Ok(output)
    } else {
        Err(Error::CommandFailed {
            program: invocation.program_name(),
            status: output.status_text(),
            stderr: output.stderr.trim().to_string(),
        })
    }
}

/// [`ProcessRunner`] backed by `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput> {
        debug!("Running: {}", invocation);
        let output = std::process::Command::new(&invocation.program)
            .args(&invocation.args)
            .output()
            .map_err(|e| Error::LaunchFailed {
                program: invocation.program_name(),
                reason: e.to_string(),
            })?;

        Ok(ProcessOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
