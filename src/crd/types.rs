//! Supporting types for the ZookeeperCluster CRD

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Lifecycle phase of a ZookeeperCluster
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[non_exhaustive]
pub enum ClusterPhase {
    /// Not yet observed by any operator
    #[default]
    #[serde(rename = "")]
    None,
    /// Ensemble resources are being created
    Creating,
    /// Ensemble is provisioned and being reconciled
    Running,
    /// Terminal error; the CR must be deleted
    Failed,
}

impl std::fmt::Display for ClusterPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, ""),
            Self::Creating => write!(f, "Creating"),
            Self::Running => write!(f, "Running"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// Compute resources requested for each ensemble member
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct ResourceSpec {
    /// CPU quantity (e.g. "500m")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,

    /// Memory quantity (e.g. "1Gi")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
}

impl ResourceSpec {
    /// Returns true if no quantity is set
    pub fn is_empty(&self) -> bool {
        self.cpu.is_none() && self.memory.is_none()
    }
}

/// Policy applied to every pod of the ensemble
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PodPolicy {
    /// Extra labels added to each pod
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Node selector for scheduling
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_selector: BTreeMap<String, String>,

    /// Resource requests applied as both request and limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceSpec>,
}
