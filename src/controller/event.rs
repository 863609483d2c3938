//! Lifecycle notifications consumed by the dispatcher

use crate::crd::ZookeeperCluster;

/// Kind of lifecycle notification
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// The resource was created
    Added,
    /// The resource's desired state changed
    Modified,
    /// The resource was removed
    Deleted,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Added => write!(f, "ADDED"),
            Self::Modified => write!(f, "MODIFIED"),
            Self::Deleted => write!(f, "DELETED"),
        }
    }
}

/// One notification from the event source: a kind plus the resource snapshot
#[derive(Clone, Debug)]
pub struct LifecycleEvent {
    /// What happened
    pub kind: EventKind,
    /// The resource as it was when the event was produced
    pub resource: ZookeeperCluster,
}

impl LifecycleEvent {
    /// Create an Added event
    pub fn added(resource: ZookeeperCluster) -> Self {
        Self {
            kind: EventKind::Added,
            resource,
        }
    }

    /// Create a Modified event
    pub fn modified(resource: ZookeeperCluster) -> Self {
        Self {
            kind: EventKind::Modified,
            resource,
        }
    }

    /// Create a Deleted event
    pub fn deleted(resource: ZookeeperCluster) -> Self {
        Self {
            kind: EventKind::Deleted,
            resource,
        }
    }
}
