// ABOUTME: Typed contract every docker subcommand implements on top of the process runner.
// ABOUTME: Each command declares whether a non-zero exit is a failure or a value to return.

mod classify;
mod container;
mod ps;
mod raw;

pub use classify::classify_failure;
pub use container::{
    ExecCommand, InspectRunningCommand, RemoveCommand, RunCommand, StopCommand, WaitCommand,
};
pub use ps::{ContainerSummary, PsCommand, PsFormat, parse_ps_output};
pub use raw::RawCommand;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;
use crate::process::{ExecResult, Invocation, ProcessRunner};

/// What a command does with a non-zero exit from the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitPolicy {
    /// Promote any non-zero exit into a classified failure.
    FailOnNonZero,
    /// Hand the raw result back; the exit code is the command's answer.
    ReturnExitCode,
}

impl ExitPolicy {
    /// Apply this policy to a finished execution.
    pub fn apply(
        self,
        runner: &ProcessRunner,
        invocation: &Invocation,
        result: ExecResult,
    ) -> Result<ExecResult> {
        match self {
            ExitPolicy::ReturnExitCode => Ok(result),
            ExitPolicy::FailOnNonZero if result.success() => Ok(result),
            ExitPolicy::FailOnNonZero => Err(classify_failure(
                runner.command_line(invocation),
                result,
            )),
        }
    }
}

/// A docker subcommand with typed output.
///
/// Implementors only describe arguments and parsing; spawning, timeout
/// enforcement, and exit classification live in the provided methods.
#[async_trait]
pub trait DockerCommand: Send + Sync {
    type Output: Send;

    /// Subcommand and flags, without the binary name or raw extras.
    fn build_args(&self) -> Vec<String>;

    /// Tokens appended verbatim after [`build_args`](Self::build_args).
    fn raw_args(&self) -> &[String];

    /// Non-zero exit handling. Deliberately has no default.
    fn exit_policy(&self) -> ExitPolicy;

    fn parse(&self, result: ExecResult) -> Result<Self::Output>;

    fn timeout(&self) -> Option<Duration> {
        None
    }

    fn invocation(&self) -> Invocation {
        Invocation::new(self.build_args())
            .raw_args(self.raw_args().iter().cloned())
            .with_optional_timeout(self.timeout())
    }

    async fn execute(&self, runner: &ProcessRunner) -> Result<Self::Output> {
        let invocation = self.invocation();
        let result = runner.run(&invocation).await?;
        let result = self.exit_policy().apply(runner, &invocation, result)?;
        self.parse(result)
    }

    fn execute_blocking(&self, runner: &ProcessRunner) -> Result<Self::Output> {
        let invocation = self.invocation();
        let result = runner.run_blocking(&invocation)?;
        let result = self.exit_policy().apply(runner, &invocation, result)?;
        self.parse(result)
    }
}
