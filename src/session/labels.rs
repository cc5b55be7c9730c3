// ABOUTME: The label contract stamped on every managed container.
// ABOUTME: Labels are the only durable record of ownership; no ledger is persisted elsewhere.

use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;

use super::SessionId;
use crate::command::ContainerSummary;
use crate::types::ContainerId;

/// Marks a container as managed (`"true"`); the orphan query filters on it.
pub const MANAGED_LABEL: &str = "dockwright.managed";
/// Session identifier of the process that created the container.
pub const SESSION_LABEL: &str = "dockwright.session";
/// Creation time, in Unix seconds.
pub const CREATED_LABEL: &str = "dockwright.created";

/// The three labels applied at creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedLabels {
    pub session: SessionId,
    pub created_at: DateTime<Utc>,
}

impl ManagedLabels {
    pub fn new(session: SessionId, created_at: DateTime<Utc>) -> Self {
        Self {
            session,
            created_at,
        }
    }

    pub fn pairs(&self) -> [(String, String); 3] {
        [
            (MANAGED_LABEL.to_string(), "true".to_string()),
            (SESSION_LABEL.to_string(), self.session.to_string()),
            (CREATED_LABEL.to_string(), self.created_at.timestamp().to_string()),
        ]
    }

    /// Render as `--label key=value` CLI arguments.
    pub fn to_args(&self) -> Vec<String> {
        self.pairs()
            .into_iter()
            .flat_map(|(k, v)| ["--label".to_string(), format!("{k}={v}")])
            .collect()
    }

    /// Recover the labels from a listed container, if it is managed.
    pub fn from_labels(labels: &HashMap<String, String>) -> Option<Self> {
        if labels.get(MANAGED_LABEL).map(String::as_str) != Some("true") {
            return None;
        }
        let session = SessionId::new(labels.get(SESSION_LABEL)?.clone());
        let created_at = labels
            .get(CREATED_LABEL)
            .and_then(|s| s.parse::<i64>().ok())
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        Some(Self {
            session,
            created_at,
        })
    }
}

/// One container under lifecycle tracking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedResource {
    pub id: ContainerId,
    pub session: SessionId,
    pub created_at: DateTime<Utc>,
}

impl ManagedResource {
    pub fn from_summary(summary: &ContainerSummary) -> Option<Self> {
        let labels = ManagedLabels::from_labels(&summary.labels)?;
        Some(Self {
            id: summary.container_id(),
            session: labels.session,
            created_at: labels.created_at,
        })
    }
}

/// Managed by someone, but not by `session`.
///
/// A managed container with no session label counts as an orphan.
pub fn is_orphan(summary: &ContainerSummary, session: &SessionId) -> bool {
    summary.label(MANAGED_LABEL) == Some("true")
        && summary.label(SESSION_LABEL) != Some(session.as_str())
}
