//! ZookeeperCluster Custom Resource Definition
//!
//! A ZookeeperCluster describes the desired state of one ZooKeeper ensemble.
//! The operator turns it into a StatefulSet plus peer and client Services.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::{ClusterPhase, PodPolicy};
use crate::{DEFAULT_CLUSTER_SIZE, DEFAULT_REPOSITORY, DEFAULT_VERSION, MAX_CLUSTER_SIZE};

/// Pod label keys the operator reserves for its own selectors
pub const RESERVED_POD_LABELS: &[&str] = &["app", "zookeeper_cluster"];

/// Specification for a ZookeeperCluster
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "zookeeper.database.apache.com",
    version = "v1alpha1",
    kind = "ZookeeperCluster",
    plural = "zookeeperclusters",
    shortname = "zkc",
    status = "ZookeeperClusterStatus",
    namespaced,
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Size","type":"integer","jsonPath":".spec.size"}"#,
    printcolumn = r#"{"name":"Version","type":"string","jsonPath":".spec.version"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ZookeeperClusterSpec {
    /// Number of ensemble members
    #[serde(default)]
    pub size: u32,

    /// ZooKeeper image tag
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,

    /// Image repository
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub repository: String,

    /// Pod-level scheduling and labelling policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod: Option<PodPolicy>,
}

impl ZookeeperClusterSpec {
    /// Fill unset fields with their defaults
    pub fn set_defaults(&mut self) {
        if self.size == 0 {
            self.size = DEFAULT_CLUSTER_SIZE;
        }
        if self.version.is_empty() {
            self.version = DEFAULT_VERSION.to_string();
        }
        if self.repository.is_empty() {
            self.repository = DEFAULT_REPOSITORY.to_string();
        }
    }

    /// Validate the cluster specification
    ///
    /// Expected to run after [`set_defaults`](Self::set_defaults).
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.size == 0 || self.size > MAX_CLUSTER_SIZE {
            return Err(crate::Error::validation(format!(
                "cluster size must be between 1 and {MAX_CLUSTER_SIZE}, got {}",
                self.size
            )));
        }

        if self.version.trim().is_empty() {
            return Err(crate::Error::validation("version must not be empty"));
        }

        if let Some(pod) = &self.pod {
            for key in RESERVED_POD_LABELS {
                if pod.labels.contains_key(*key) {
                    return Err(crate::Error::validation(format!(
                        "pod label key '{key}' is reserved by the operator"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Container image for ensemble members
    pub fn image(&self) -> String {
        format!("{}:{}", self.repository, self.version)
    }
}

/// Status for a ZookeeperCluster
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ZookeeperClusterStatus {
    /// Current phase of the cluster lifecycle
    #[serde(default)]
    pub phase: ClusterPhase,

    /// Why the cluster is in its current phase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Number of members currently provisioned
    #[serde(default)]
    pub size: u32,

    /// Image tag currently deployed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_version: Option<String>,
}

impl ZookeeperClusterStatus {
    /// Create a new status with the given phase
    pub fn with_phase(phase: ClusterPhase) -> Self {
        Self {
            phase,
            ..Default::default()
        }
    }

    /// Set the reason and return self for chaining
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Record the provisioned size and version and return self for chaining
    pub fn members(mut self, size: u32, version: impl Into<String>) -> Self {
        self.size = size;
        self.current_version = Some(version.into());
        self
    }

    /// Returns true if the cluster is in the terminal Failed phase
    pub fn is_failed(&self) -> bool {
        self.phase == ClusterPhase::Failed
    }
}

impl ZookeeperCluster {
    /// Returns true if the reported status is Failed
    pub fn is_failed(&self) -> bool {
        self.status
            .as_ref()
            .map(ZookeeperClusterStatus::is_failed)
            .unwrap_or(false)
    }
}
