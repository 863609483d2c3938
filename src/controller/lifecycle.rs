//! Failure quarantine policy
//!
//! A cluster whose status reports Failed may only leave management through a
//! Deleted event. Everything else is refused until the user deletes the CR.

use super::EventKind;
use crate::crd::ZookeeperCluster;

/// What the dispatcher may do with an event for a failed cluster
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quarantine {
    /// The cluster is healthy; reconcile normally
    Clear,
    /// Failed cluster being deleted; drop it from the registry
    Release,
    /// Failed cluster receiving a non-delete event; refuse it
    Reject,
}

/// Returns true if the cluster is in a terminal failed condition
pub fn is_failed(cluster: &ZookeeperCluster) -> bool {
    cluster.is_failed()
}

/// Classify an event against the quarantine policy
pub fn quarantine(cluster: &ZookeeperCluster, kind: EventKind) -> Quarantine {
    match (is_failed(cluster), kind) {
        (false, _) => Quarantine::Clear,
        (true, EventKind::Deleted) => Quarantine::Release,
        (true, EventKind::Added | EventKind::Modified) => Quarantine::Reject,
    }
}
