// ABOUTME: Integration tests for runtime detection against a scripted fake CLI.
// ABOUTME: Covers classification, endpoint precedence, caching, and uncached failures.

mod support;

use dockwright::error::ErrorKind;
use dockwright::platform::{Feature, PlatformDetector, RuntimeKind};
use support::FakeDocker;

const PODMAN_VERSION: &str = "\
Client:       Podman Engine
Version:      5.0.2
API Version:  5.0.2
";

#[test]
fn detects_plain_docker_through_the_context_endpoint() {
    let fake = FakeDocker::new();
    let detector = PlatformDetector::new(fake.runner());

    let info = temp_env::with_var_unset("DOCKER_HOST", || detector.detect_blocking()).unwrap();

    assert_eq!(info.kind, RuntimeKind::Docker);
    assert_eq!(info.version.as_deref(), Some("26.1.1"));
    assert_eq!(info.endpoint.as_deref(), Some("unix:///var/run/docker.sock"));
    assert_eq!(
        fake.calls_starting_with("context"),
        ["context inspect --format {{.Endpoints.docker.Host}}"]
    );
}

#[test]
fn result_is_cached_after_first_detection() {
    let fake = FakeDocker::new();
    let detector = PlatformDetector::new(fake.runner().env("DOCKER_HOST", "unix:///var/run/docker.sock"));
    assert!(detector.cached().is_none());

    let first = detector.detect_blocking().unwrap();
    let second = detector.detect_blocking().unwrap();

    assert_eq!(first, second);
    assert_eq!(detector.cached(), Some(&first));
    assert_eq!(fake.calls_starting_with("version").len(), 1);
}

#[tokio::test]
async fn async_and_blocking_share_the_cache() {
    let fake = FakeDocker::new();
    let detector = PlatformDetector::new(fake.runner().env("DOCKER_HOST", "unix:///var/run/docker.sock"));

    let first = detector.detect().await.unwrap();
    let second = detector.detect_blocking().unwrap();

    assert_eq!(first, second);
    assert_eq!(fake.calls_starting_with("version").len(), 1);
}

#[test]
fn podman_version_text_is_recognized() {
    let fake = FakeDocker::new();
    fake.set_version(PODMAN_VERSION);
    let detector = PlatformDetector::new(fake.runner().env("DOCKER_HOST", "unix:///tmp/some.sock"));

    let info = detector.detect_blocking().unwrap();

    assert_eq!(info.kind, RuntimeKind::Podman);
    assert_eq!(info.version.as_deref(), Some("5.0.2"));
    assert!(info.ensure_supports(Feature::Swarm).is_err());
}

#[test]
fn runner_docker_host_skips_context_lookup() {
    let fake = FakeDocker::new();
    let endpoint = "unix:///Users/dev/.colima/default/docker.sock";
    let detector = PlatformDetector::new(fake.runner().env("DOCKER_HOST", endpoint));

    let info = detector.detect_blocking().unwrap();

    assert_eq!(info.kind, RuntimeKind::Colima);
    assert_eq!(info.endpoint.as_deref(), Some(endpoint));
    assert!(fake.calls_starting_with("context").is_empty());
}

#[test]
fn process_docker_host_is_honoured() {
    let fake = FakeDocker::new();
    let endpoint = "unix:///run/user/1000/podman/podman.sock";
    let detector = PlatformDetector::new(fake.runner());

    let info = temp_env::with_var("DOCKER_HOST", Some(endpoint), || detector.detect_blocking())
        .unwrap();

    assert_eq!(info.kind, RuntimeKind::Podman);
    assert_eq!(info.endpoint.as_deref(), Some(endpoint));
}

#[test]
fn daemon_down_is_reported_and_not_cached() {
    let fake = FakeDocker::new();
    support::write_script(
        &fake.program(),
        "#!/bin/sh\necho \"$*\" >> \"$FAKE_DOCKER_DIR/calls.log\"\nprintf 'Client:\\n Version: 26.1.0\\n'\necho 'Cannot connect to the Docker daemon at unix:///var/run/docker.sock. Is the docker daemon running?' >&2\nexit 1\n",
    );
    let detector = PlatformDetector::new(fake.runner());

    let err = detector.detect_blocking().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DaemonNotRunning);
    assert!(detector.cached().is_none());

    let _ = detector.detect_blocking();
    assert_eq!(fake.calls_starting_with("version").len(), 2);
}

#[test]
fn missing_cli_is_tool_not_found() {
    let detector = PlatformDetector::new(dockwright::process::ProcessRunner::new(
        "dockwright-no-such-cli-77c1",
    ));
    let err = detector.detect_blocking().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ToolNotFound);
}
