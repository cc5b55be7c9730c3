// ABOUTME: End-to-end tests for the process-exit sweep, run in a child copy of this test binary.
// ABOUTME: The child installs the hook, tracks a container, and exits; the fake docker log shows the teardown.

mod support;

use dockwright::config::LifecycleConfig;
use dockwright::process::ProcessRunner;
use dockwright::session::{DockerCli, SessionRegistry};
use dockwright::types::ContainerId;
use std::sync::Arc;
use support::FakeDocker;

const CHILD_PROGRAM: &str = "DOCKWRIGHT_EXIT_CHILD_PROGRAM";
const CHILD_STATE: &str = "DOCKWRIGHT_EXIT_CHILD_STATE";
const CHILD_EXIT_CODE: &str = "DOCKWRIGHT_EXIT_CHILD_CODE";

/// Body of the child process. Does nothing when run by the normal harness.
#[test]
fn child_tracks_a_container_and_exits() {
    let (Ok(program), Ok(state)) = (std::env::var(CHILD_PROGRAM), std::env::var(CHILD_STATE))
    else {
        return;
    };

    let runner = ProcessRunner::new(program).env("FAKE_DOCKER_DIR", state);
    let registry = Arc::new(SessionRegistry::new(Arc::new(DockerCli::new(runner))));
    registry
        .configure(LifecycleConfig {
            install_shutdown_hook: true,
            ..Default::default()
        })
        .unwrap();
    registry.track(ContainerId::new("abc123"));

    if let Ok(code) = std::env::var(CHILD_EXIT_CODE) {
        std::process::exit(code.parse().unwrap());
    }
}

fn run_child(fake: &FakeDocker, exit_code: Option<i32>) -> assert_cmd::assert::Assert {
    let mut cmd = assert_cmd::Command::new(std::env::current_exe().unwrap());
    cmd.args([
        "child_tracks_a_container_and_exits",
        "--exact",
        "--nocapture",
        "--test-threads=1",
    ])
    .env(CHILD_PROGRAM, fake.program())
    .env(CHILD_STATE, fake.dir())
    .env_remove(CHILD_EXIT_CODE);
    if let Some(code) = exit_code {
        cmd.env(CHILD_EXIT_CODE, code.to_string());
    }
    cmd.assert()
}

#[test]
fn tracked_container_is_removed_when_main_returns() {
    let fake = FakeDocker::new();

    run_child(&fake, None).success();

    assert_eq!(
        fake.calls(),
        ["stop --time 2 abc123", "rm --force --volumes abc123"]
    );
}

#[test]
fn tracked_container_is_removed_on_process_exit() {
    let fake = FakeDocker::new();

    run_child(&fake, Some(3)).code(3);

    assert_eq!(
        fake.calls(),
        ["stop --time 2 abc123", "rm --force --volumes abc123"]
    );
}

#[test]
fn missing_container_still_exits_cleanly() {
    let fake = FakeDocker::new();
    fake.mark_missing("abc123");

    run_child(&fake, None).success();

    assert_eq!(fake.calls_starting_with("rm"), ["rm --force --volumes abc123"]);
}
