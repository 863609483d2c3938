//! Custom Resource Definitions for the ZooKeeper operator

mod cluster;
mod types;

pub use cluster::{
    ZookeeperCluster, ZookeeperClusterSpec, ZookeeperClusterStatus, RESERVED_POD_LABELS,
};
pub use types::{ClusterPhase, PodPolicy, ResourceSpec};
