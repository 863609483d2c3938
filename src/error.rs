//! Error types for the ZooKeeper operator

use thiserror::Error;

use crate::controller::EventKind;

/// Main error type for operator operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// A non-delete event arrived for a cluster whose status is Failed
    #[error("ignore failed cluster ({name}). Please delete its CR")]
    FailedCluster {
        /// Name of the quarantined cluster
        name: String,
    },

    /// The cluster spec did not survive defaulting and validation
    #[error("invalid cluster spec. please fix the following problem with the cluster spec: {0}")]
    InvalidSpec(String),

    /// An Added event arrived for a cluster that is already tracked
    #[error("unsafe state. cluster ({name}) was created before but we received event ({event})")]
    AlreadyTracked {
        /// Name of the cluster
        name: String,
        /// Kind of the offending event
        event: EventKind,
    },

    /// A Modified or Deleted event arrived for a cluster that was never tracked
    #[error("unsafe state. cluster ({name}) was never created but we received event ({event})")]
    NeverTracked {
        /// Name of the cluster
        name: String,
        /// Kind of the offending event
        event: EventKind,
    },

    /// Validation error for a single spec field
    #[error("validation error: {0}")]
    Validation(String),

    /// The instance controller failed to provision, update or tear down an ensemble
    #[error("instance error: {0}")]
    Instance(String),

    /// Resource type registration or readiness wait failed
    #[error("bootstrap error: {0}")]
    Bootstrap(String),

    /// Metric registration or export failed
    #[error("metrics error: {0}")]
    Metrics(String),
}

impl Error {
    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an instance controller error with the given message
    pub fn instance(msg: impl Into<String>) -> Self {
        Self::Instance(msg.into())
    }

    /// Create a bootstrap error with the given message
    pub fn bootstrap(msg: impl Into<String>) -> Self {
        Self::Bootstrap(msg.into())
    }

    /// Create a metrics error with the given message
    pub fn metrics(msg: impl Into<String>) -> Self {
        Self::Metrics(msg.into())
    }

    /// Returns true if this error reports an event inconsistent with the registry
    ///
    /// These are never repaired by the dispatcher: they mean the event source broke
    /// its per-name ordering contract or the bookkeeping diverged.
    pub fn is_unsafe_state(&self) -> bool {
        matches!(self, Self::AlreadyTracked { .. } | Self::NeverTracked { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Story: A failed cluster tells the user exactly what to do next
    #[test]
    fn story_failed_cluster_error_asks_for_deletion() {
        let err = Error::FailedCluster {
            name: "zk-prod".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("ignore failed cluster"));
        assert!(msg.contains("(zk-prod)"));
        assert!(msg.ends_with("Please delete its CR"));
    }

    /// Story: Ordering violations name the cluster and the offending event
    #[test]
    fn story_unsafe_state_errors_identify_event() {
        let err = Error::AlreadyTracked {
            name: "zk-a".to_string(),
            event: EventKind::Added,
        };
        assert_eq!(
            err.to_string(),
            "unsafe state. cluster (zk-a) was created before but we received event (ADDED)"
        );
        assert!(err.is_unsafe_state());

        let err = Error::NeverTracked {
            name: "zk-b".to_string(),
            event: EventKind::Deleted,
        };
        assert_eq!(
            err.to_string(),
            "unsafe state. cluster (zk-b) was never created but we received event (DELETED)"
        );
        assert!(err.is_unsafe_state());
    }

    /// Story: Spec problems are reported with the offending detail
    #[test]
    fn story_invalid_spec_wraps_detail() {
        let err = Error::InvalidSpec("cluster size must be between 1 and 7".to_string());
        assert!(err
            .to_string()
            .starts_with("invalid cluster spec. please fix the following problem"));
        assert!(err.to_string().contains("between 1 and 7"));
        assert!(!err.is_unsafe_state());
    }

    /// Story: Error constructors accept both String and &str
    #[test]
    fn story_error_construction_ergonomics() {
        let err = Error::instance(format!("statefulset {} apply failed", "zk-a"));
        assert!(err.to_string().contains("instance error"));
        assert!(err.to_string().contains("zk-a"));

        let err = Error::bootstrap("CRD not established");
        assert!(err.to_string().contains("bootstrap error"));

        let err = Error::metrics("duplicate collector");
        assert_eq!(err.to_string(), "metrics error: duplicate collector");

        match Error::validation("any message") {
            Error::Validation(msg) => assert_eq!(msg, "any message"),
            _ => panic!("Expected Validation variant"),
        }
    }
}
