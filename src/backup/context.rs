use crate::backup::clock::{Clock, SystemClock};
use crate::backup::command::{CommandLine, CommandOutput, CommandRunner, SystemCommandRunner};
use crate::backup::config::Defaults;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;

use bon::Builder;
use getset::{CopyGetters, Getters, Setters};

/// What to do with an external tool's non-zero exit status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExitStatusPolicy {
    /// Log a warning and treat the tool as having run.
    #[default]
    Lenient,
    /// Fail the job.
    Strict,
}

/// Everything a handler may touch during one run.
#[derive(Builder, Getters, CopyGetters, Setters)]
pub struct RunContext {
    #[getset(get = "pub")]
    defaults: Defaults,
    #[builder(default)]
    #[getset(get_copy = "pub", set = "pub")]
    dry_run: bool,
    #[builder(default = Box::new(SystemCommandRunner))]
    runner: Box<dyn CommandRunner>,
    #[builder(default = Box::new(SystemClock))]
    clock: Box<dyn Clock>,
}

impl RunContext {
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn exit_status_policy(&self) -> ExitStatusPolicy {
        if *self.defaults.strict_exit_codes() {
            ExitStatusPolicy::Strict
        } else {
            ExitStatusPolicy::Lenient
        }
    }

    /// Runs an external tool. The single place where exit codes are judged.
    pub fn run_tool(&self, command: &CommandLine) -> Result<CommandOutput> {
        let output = self.runner.execute(command)?;
        if output.success() {
            return Ok(output);
        }

        let status = output.status.unwrap_or(-1);
        match self.exit_status_policy() {
            ExitStatusPolicy::Lenient => {
                tracing::warn!(
                    "{command} exited with status {status}, continuing: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                Ok(output)
            }
            ExitStatusPolicy::Strict => Err(Error::CommandFailed {
                command: command.to_string(),
                status,
            }),
        }
    }

    /// Runs a tool whose exit status the caller inspects itself.
    pub fn probe_tool(&self, command: &CommandLine) -> Result<CommandOutput> {
        self.runner.execute(command)
    }
}
