//! External tool invocation.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// How to launch an external media tool: a program plus optional leading
/// arguments (e.g. a wrapper such as `nice -n 10`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: PathBuf,
    leading_args: Vec<OsString>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn program(&self) -> &PathBuf {
        &self.program
    }

    /// A tokio command with the program and leading arguments applied.
    /// The child is killed if the handle is dropped before it exits.
    pub fn command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.leading_args)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }

    /// Whether the program resolves on PATH (or exists, for absolute paths).
    pub fn is_available(&self) -> bool {
        if self.program.is_absolute() {
            return self.program.exists();
        }
        command_exists(&self.program.to_string_lossy())
    }
}

/// Check whether a binary is resolvable through the shell.
fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}
