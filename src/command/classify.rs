// ABOUTME: Maps a failed CLI execution onto the structured failure taxonomy.
// ABOUTME: Recognizes daemon-down and missing-resource diagnostics; the rest stays CommandFailed.

use crate::error::Error;
use crate::process::ExecResult;

const DAEMON_DOWN_MARKERS: &[&str] = &[
    "cannot connect to the docker daemon",
    "is the docker daemon running",
    "cannot connect to podman",
    "error during connect",
];

const NOT_FOUND_MARKERS: &[&str] = &["no such container:", "no such object:", "no such image:"];

/// Classify a non-zero execution. The tool's stderr is carried through untouched.
pub fn classify_failure(command: String, result: ExecResult) -> Error {
    let stderr = result.stderr.as_str();

    if DAEMON_DOWN_MARKERS
        .iter()
        .any(|m| after_marker(stderr, m).is_some())
    {
        return Error::DaemonNotRunning(stderr.trim().to_string());
    }

    for marker in NOT_FOUND_MARKERS {
        if let Some(end) = after_marker(stderr, marker) {
            let rest = stderr.get(end..).unwrap_or_default();
            let id = rest.split_whitespace().next().unwrap_or_default();
            return Error::NotFound(id.to_string());
        }
    }

    Error::CommandFailed {
        command,
        exit_code: result.exit_code,
        stdout: result.stdout,
        stderr: result.stderr,
    }
}

/// A clean exit whose stdout the command could not make sense of.
pub(crate) fn unexpected_output(command: impl Into<String>, result: ExecResult) -> Error {
    let command = command.into();
    tracing::debug!(%command, stdout = %result.stdout, "unrecognized output");
    Error::CommandFailed {
        command,
        exit_code: result.exit_code,
        stdout: result.stdout,
        stderr: result.stderr,
    }
}

/// Byte offset just past `marker` in `text`, matched ASCII case-insensitively.
///
/// Markers are ASCII, so the offset always lands on a char boundary.
fn after_marker(text: &str, marker: &str) -> Option<usize> {
    text.as_bytes()
        .windows(marker.len())
        .position(|w| w.eq_ignore_ascii_case(marker.as_bytes()))
        .map(|pos| pos + marker.len())
}
