// ABOUTME: Escape-hatch command that passes a full token list straight to the CLI.
// ABOUTME: The caller picks the exit policy, since nothing about the command is known.

use nonempty::NonEmpty;
use std::time::Duration;

use super::{DockerCommand, ExitPolicy};
use crate::error::Result;
use crate::process::ExecResult;

/// Any subcommand, expressed as raw tokens.
#[derive(Debug, Clone)]
pub struct RawCommand {
    tokens: NonEmpty<String>,
    policy: ExitPolicy,
    timeout: Option<Duration>,
    raw: Vec<String>,
}

impl RawCommand {
    pub fn new(tokens: NonEmpty<String>, policy: ExitPolicy) -> Self {
        Self {
            tokens,
            policy,
            timeout: None,
            raw: Vec::new(),
        }
    }

    /// Build from a token list, returning `None` when it is empty.
    pub fn from_vec(tokens: Vec<String>, policy: ExitPolicy) -> Option<Self> {
        NonEmpty::from_vec(tokens).map(|tokens| Self::new(tokens, policy))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn raw_arg(mut self, token: impl Into<String>) -> Self {
        self.raw.push(token.into());
        self
    }

    pub fn subcommand(&self) -> &str {
        &self.tokens.head
    }
}

impl DockerCommand for RawCommand {
    type Output = ExecResult;

    fn build_args(&self) -> Vec<String> {
        self.tokens.iter().cloned().collect()
    }

    fn raw_args(&self) -> &[String] {
        &self.raw
    }

    fn exit_policy(&self) -> ExitPolicy {
        self.policy
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn parse(&self, result: ExecResult) -> Result<ExecResult> {
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_token_list_is_rejected() {
        assert!(RawCommand::from_vec(Vec::new(), ExitPolicy::FailOnNonZero).is_none());
    }

    #[test]
    fn tokens_pass_through_in_order() {
        let cmd = RawCommand::from_vec(
            vec!["network".into(), "ls".into()],
            ExitPolicy::ReturnExitCode,
        )
        .unwrap()
        .raw_arg("--quiet")
        .with_timeout(Duration::from_secs(3));

        assert_eq!(cmd.subcommand(), "network");
        let inv = cmd.invocation();
        assert_eq!(inv.args(), ["network", "ls", "--quiet"]);
        assert_eq!(inv.timeout(), Some(Duration::from_secs(3)));
    }
}
