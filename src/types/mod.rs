// ABOUTME: Typed identifiers shared across the runner, commands, and registry.
// ABOUTME: Uses phantom types so identifier kinds cannot be mixed up.

mod id;

pub use id::{ContainerId, ContainerMarker, Id};
