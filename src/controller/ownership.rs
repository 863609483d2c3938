//! Ownership filtering
//!
//! A cluster-wide operator and any number of namespaced operators can run side
//! by side. The scope annotation decides which of them owns a given cluster.

use kube::ResourceExt;

use crate::config::OperatorConfig;
use crate::crd::ZookeeperCluster;
use crate::{SCOPE_ANNOTATION, SCOPE_CLUSTERWIDE};

/// Returns true if the resource carries the cluster-wide scope marker
fn is_clusterwide(cluster: &ZookeeperCluster) -> bool {
    cluster
        .annotations()
        .get(SCOPE_ANNOTATION)
        .is_some_and(|scope| scope == SCOPE_CLUSTERWIDE)
}

/// Decide whether this operator instance is responsible for `cluster`
///
/// A cluster-wide operator manages only annotated clusters; a namespaced
/// operator manages everything else.
pub fn managed(cluster: &ZookeeperCluster, config: &OperatorConfig) -> bool {
    is_clusterwide(cluster) == config.cluster_wide
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::ZookeeperClusterSpec;

    fn cluster_with_scope(scope: Option<&str>) -> ZookeeperCluster {
        let mut cluster = ZookeeperCluster::new("zk", ZookeeperClusterSpec::default());
        if let Some(scope) = scope {
            cluster
                .annotations_mut()
                .insert(SCOPE_ANNOTATION.to_string(), scope.to_string());
        }
        cluster
    }

    fn config(cluster_wide: bool) -> OperatorConfig {
        OperatorConfig {
            cluster_wide,
            ..Default::default()
        }
    }

    #[test]
    fn test_clusterwide_operator_owns_annotated_cluster() {
        assert!(managed(&cluster_with_scope(Some("clusterwide")), &config(true)));
    }

    #[test]
    fn test_clusterwide_operator_ignores_unannotated_cluster() {
        assert!(!managed(&cluster_with_scope(None), &config(true)));
    }

    #[test]
    fn test_clusterwide_operator_ignores_other_scope_values() {
        assert!(!managed(&cluster_with_scope(Some("namespace")), &config(true)));
    }

    #[test]
    fn test_namespaced_operator_ignores_clusterwide_cluster() {
        assert!(!managed(&cluster_with_scope(Some("clusterwide")), &config(false)));
    }

    #[test]
    fn test_namespaced_operator_owns_everything_else() {
        assert!(managed(&cluster_with_scope(None), &config(false)));
        assert!(managed(&cluster_with_scope(Some("")), &config(false)));
    }
}
