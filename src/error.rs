// ABOUTME: Crate-wide failure taxonomy for docker CLI execution.
// ABOUTME: A closed set of variants so retry and cleanup logic can match exhaustively.

use std::time::Duration;
use thiserror::Error;

use crate::platform::RuntimeKind;

#[derive(Debug, Error)]
pub enum Error {
    #[error("executable not found on PATH: {0}")]
    ToolNotFound(String),

    #[error("container daemon is not running: {0}")]
    DaemonNotRunning(String),

    #[error("`{command}` exited with code {exit_code}: {}", .stderr.trim_end())]
    CommandFailed {
        command: String,
        exit_code: i32,
        stdout: String,
        stderr: String,
    },

    #[error("command timed out after {0:?}")]
    Timeout(Duration),

    #[error("no such resource: {0}")]
    NotFound(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("`{command}` is not supported by {runtime}")]
    Unsupported { command: String, runtime: RuntimeKind },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ToolNotFound,
    DaemonNotRunning,
    CommandFailed,
    Timeout,
    NotFound,
    InvalidConfig,
    Unsupported,
    Io,
}

impl Error {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ToolNotFound(_) => ErrorKind::ToolNotFound,
            Error::DaemonNotRunning(_) => ErrorKind::DaemonNotRunning,
            Error::CommandFailed { .. } => ErrorKind::CommandFailed,
            Error::Timeout(_) => ErrorKind::Timeout,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::InvalidConfig(_) => ErrorKind::InvalidConfig,
            Error::Unsupported { .. } => ErrorKind::Unsupported,
            Error::Io(_) => ErrorKind::Io,
        }
    }

    /// Whether a failure of this kind can clear up on its own.
    ///
    /// Timeouts and an unreachable daemon are transient; everything else
    /// will fail the same way on the next attempt.
    pub fn is_transient(&self) -> bool {
        match self.kind() {
            ErrorKind::Timeout | ErrorKind::DaemonNotRunning => true,
            ErrorKind::ToolNotFound
            | ErrorKind::CommandFailed
            | ErrorKind::NotFound
            | ErrorKind::InvalidConfig
            | ErrorKind::Unsupported
            | ErrorKind::Io => false,
        }
    }

    /// Exit code of the underlying tool, if the failure came from one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Error::CommandFailed { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }

    /// Captured stderr of the underlying tool, if the failure came from one.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Error::CommandFailed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}
