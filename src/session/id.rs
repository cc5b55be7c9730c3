// ABOUTME: Short random identifier generated once per process run.
// ABOUTME: Stamped on every managed container to tell this run's resources from orphans.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

const SESSION_ID_LEN: usize = 8;

static CURRENT: OnceLock<SessionId> = OnceLock::new();

/// Identifies one run of the hosting process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// This process's session, generated on first use.
    pub fn current() -> &'static SessionId {
        CURRENT.get_or_init(Self::generate)
    }

    /// A fresh identifier: 8 lowercase hex characters.
    pub fn generate() -> Self {
        let mut value = uuid::Uuid::new_v4().simple().to_string();
        value.truncate(SESSION_ID_LEN);
        Self(value)
    }

    /// Wrap an identifier read back from a resource label.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
