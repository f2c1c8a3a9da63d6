//! Child process helpers.
//!
//! Every external tool is started through [`CommandLine`]. Encoders run with
//! their output discarded; probes and metric tools have one stream captured
//! as text. Exit codes are always recorded as an [`Outcome`] and it is up to
//! the caller, usually through an [`ExitPolicy`], whether a failure matters.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};

use tracing::debug;

use crate::error::{Error, Result};

/// How a child process finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Exit status zero.
    Success,
    /// Non-zero exit status, or terminated by a signal (`code` is `None`).
    Failed {
        /// Exit code, if the process exited normally.
        code: Option<i32>,
    },
}

impl Outcome {
    /// Whether the process exited successfully.
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl From<ExitStatus> for Outcome {
    fn from(status: ExitStatus) -> Self {
        if status.success() {
            Self::Success
        } else {
            Self::Failed {
                code: status.code(),
            }
        }
    }
}

/// What to do when an encoder exits unsuccessfully.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExitPolicy {
    /// Treat every finished process as completed. A failed encode only shows
    /// up later, when its output file is missing.
    #[default]
    Ignore,
    /// Turn any unsuccessful exit into [`Error::ToolFailed`].
    Require,
}

impl ExitPolicy {
    /// Apply the policy to one outcome.
    pub fn check(self, outcome: Outcome, tool: &str, input: &Path) -> Result<()> {
        match (self, outcome) {
            (Self::Require, Outcome::Failed { code }) => Err(Error::ToolFailed {
                tool: tool.to_string(),
                input: input.to_path_buf(),
                code,
            }),
            _ => Ok(()),
        }
    }
}

/// A program plus its arguments, ready to be started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: PathBuf,
    args: Vec<OsString>,
}

impl CommandLine {
    /// Create a command line for `program` with no arguments.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Program path.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments, in order.
    #[must_use]
    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }

    fn command(&self) -> Command {
        debug!(program = %self.program.display(), args = ?self.args, "spawning");
        let mut command = Command::new(&self.program);
        command.args(&self.args).stdin(Stdio::null());
        command
    }

    fn spawn_error(&self, source: std::io::Error) -> Error {
        Error::Spawn {
            program: self.program.clone(),
            source,
        }
    }

    /// Start the process with stdout and stderr discarded, without waiting.
    pub fn spawn_quiet(&self) -> Result<Child> {
        self.command()
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| self.spawn_error(e))
    }

    /// Run the process to completion with its output discarded.
    pub fn run_quiet(&self) -> Result<Outcome> {
        let mut child = self.spawn_quiet()?;
        wait(&mut child)
    }

    /// Run to completion and return stdout as text. Stderr is discarded and
    /// the exit code is not checked.
    pub fn capture_stdout(&self) -> Result<String> {
        let output = self
            .command()
            .stderr(Stdio::null())
            .output()
            .map_err(|e| self.spawn_error(e))?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Run to completion and return stderr as text. Stdout is discarded and
    /// the exit code is not checked.
    pub fn capture_stderr(&self) -> Result<String> {
        let output = self
            .command()
            .stdout(Stdio::null())
            .output()
            .map_err(|e| self.spawn_error(e))?;
        Ok(String::from_utf8_lossy(&output.stderr).into_owned())
    }
}

/// Block until `child` exits.
pub fn wait(child: &mut Child) -> Result<Outcome> {
    Ok(child.wait()?.into())
}
