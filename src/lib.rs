//! ZooKeeper operator - CRD-driven Kubernetes operator for ZooKeeper ensembles
//!
//! Watches `ZookeeperCluster` resources and keeps one ensemble per resource in
//! step with the stream of lifecycle events the API server delivers.
//!
//! # Architecture
//!
//! - A watcher feeds raw events to the [`informer`], which turns them into
//!   ordered Added/Modified/Deleted notifications.
//! - The [`controller::Dispatcher`] filters each notification by ownership and
//!   failure quarantine, validates the spec and drives an
//!   [`ensemble::InstanceController`].
//! - Several operators can share a cluster: one cluster-wide instance owns
//!   resources annotated with the scope marker, namespaced instances own the rest.
//!
//! # Modules
//!
//! - [`crd`] - ZookeeperCluster Custom Resource Definition
//! - [`controller`] - Ownership, quarantine, registry and dispatcher
//! - [`ensemble`] - Instance controllers that provision ensembles
//! - [`informer`] - Watch event translation
//! - [`operator`] - Event loop tying the watcher to the dispatcher
//! - [`bootstrap`] - CRD registration at startup
//! - [`metrics`] - Reconciliation counters
//! - [`server`] - Metrics and health HTTP endpoint
//! - [`retry`] - Retry helpers
//! - [`config`] - Operator configuration
//! - [`error`] - Error types for the operator

#![deny(missing_docs)]

use std::time::Duration;

pub mod bootstrap;
pub mod config;
pub mod controller;
pub mod crd;
pub mod ensemble;
pub mod error;
pub mod informer;
pub mod metrics;
pub mod operator;
pub mod retry;
pub mod server;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Default Configuration Constants
// =============================================================================

/// Annotation selecting which operator instance owns a cluster
pub const SCOPE_ANNOTATION: &str = "zookeeper.database.apache.com/scope";

/// Scope annotation value claimed by the cluster-wide operator
pub const SCOPE_CLUSTERWIDE: &str = "clusterwide";

/// Full name of the ZookeeperCluster CRD
pub const CRD_NAME: &str = "zookeeperclusters.zookeeper.database.apache.com";

/// Field manager used for server-side apply
pub const FIELD_MANAGER: &str = "zookeeper-operator";

/// Ensemble size used when the spec leaves it unset
pub const DEFAULT_CLUSTER_SIZE: u32 = 3;

/// Largest ensemble the operator will provision
pub const MAX_CLUSTER_SIZE: u32 = 7;

/// ZooKeeper image tag used when the spec leaves it unset
pub const DEFAULT_VERSION: &str = "3.5.5";

/// Image repository used when the spec leaves it unset
pub const DEFAULT_REPOSITORY: &str = "zookeeper";

/// Client port
pub const CLIENT_PORT: u16 = 2181;

/// Follower-to-leader port
pub const PEER_PORT: u16 = 2888;

/// Leader election port
pub const ELECTION_PORT: u16 = 3888;

/// Interval between CRD bootstrap attempts
pub const DEFAULT_INIT_RETRY_INTERVAL: Duration = Duration::from_secs(30);

/// Watcher timeout (seconds) - must be less than the client read timeout (30s)
pub const WATCH_TIMEOUT_SECS: u32 = 25;
