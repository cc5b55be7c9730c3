// ABOUTME: Session-scoped tracking of containers this process created.
// ABOUTME: Labels make ownership recoverable across runs, so orphans from crashed runs get swept.

mod id;
mod labels;
mod ops;
mod registry;
mod shutdown;

pub use id::SessionId;
pub use labels::{
    CREATED_LABEL, MANAGED_LABEL, ManagedLabels, ManagedResource, SESSION_LABEL, is_orphan,
};
pub use ops::{ContainerFilters, ContainerOps, DockerCli};
pub use registry::SessionRegistry;
