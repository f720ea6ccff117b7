//! The narrow seam to external programs (dump, transfer and packaging tools).
//!
//! Handlers build a [`CommandLine`] and hand it to a [`CommandRunner`]. The
//! real runner spawns the process, tests swap in a recording fake.

use crate::backup::redacted::RedactedString;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::AddMsg;

use itertools::Itertools;

use std::ffi::OsString;
use std::fmt::{Debug, Display, Formatter};
use std::path::Path;
use std::process::Command;

#[derive(Clone, PartialEq, Eq)]
pub enum CommandArg {
    Plain(OsString),
    Secret(RedactedString),
}

impl CommandArg {
    fn to_os_string(&self) -> OsString {
        match self {
            CommandArg::Plain(s) => s.clone(),
            CommandArg::Secret(s) => s.inner().into(),
        }
    }
}

impl Display for CommandArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandArg::Plain(s) => write!(f, "{}", s.to_string_lossy()),
            CommandArg::Secret(s) => write!(f, "{s}"),
        }
    }
}

impl Debug for CommandArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandLine {
    program: String,
    args: Vec<CommandArg>,
}

impl CommandLine {
    pub fn new<S: Into<String>>(program: S) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg<S: Into<OsString>>(mut self, arg: S) -> Self {
        self.args.push(CommandArg::Plain(arg.into()));
        self
    }

    pub fn args<I, S>(self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        args.into_iter().fold(self, |cmd, a| cmd.arg(a))
    }

    pub fn path_args<I, P>(self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        paths
            .into_iter()
            .fold(self, |cmd, p| cmd.arg(p.as_ref().as_os_str()))
    }

    /// `prefix` is shown in logs, `secret` is not.
    pub fn secret_arg<S: AsRef<str>>(mut self, prefix: &str, secret: S) -> Self {
        self.args.push(CommandArg::Secret(RedactedString::from(
            format!("{prefix}{}", secret.as_ref()).as_str(),
        )));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn os_args(&self) -> Vec<OsString> {
        self.args.iter().map(CommandArg::to_os_string).collect()
    }
}

impl Display for CommandLine {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.args.is_empty() {
            write!(f, "{}", self.program)
        } else {
            write!(f, "{} {}", self.program, self.args.iter().join(" "))
        }
    }
}

/// Exit status (`None` when killed by a signal) and captured streams.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub status: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

pub trait CommandRunner {
    fn execute(&self, command: &CommandLine) -> Result<CommandOutput>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn execute(&self, command: &CommandLine) -> Result<CommandOutput> {
        tracing::debug!("Executing {command}");
        let output = Command::new(command.program())
            .args(command.os_args())
            .output()
            .map_err(Error::from)
            .add_msg(format!("Failed to spawn {:?}", command.program()))?;

        Ok(CommandOutput {
            status: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}
