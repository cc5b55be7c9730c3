// ABOUTME: Child process execution for the docker CLI.
// ABOUTME: Exposes blocking and async entry points over one deadlock-free runner.

mod cancel;
mod invocation;
mod runner;

pub use cancel::{CancelGuard, CancelToken};
pub use invocation::{ExecResult, Invocation};
pub use runner::{DEFAULT_PROGRAM, ProcessRunner};
