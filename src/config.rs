//! Operator configuration
//!
//! Populated from the command line in `main.rs`. Kubernetes client handles are
//! built separately and given to the collaborators that need them.

use std::time::Duration;

use crate::retry::RetryConfig;
use crate::DEFAULT_INIT_RETRY_INTERVAL;

/// Configuration recognised by the operator
#[derive(Clone, Debug)]
pub struct OperatorConfig {
    /// Namespace the operator watches when not running cluster-wide
    pub namespace: String,
    /// Manage only clusters annotated with the cluster-wide scope marker
    pub cluster_wide: bool,
    /// Service account handed to every provisioned ensemble
    pub service_account: String,
    /// Register the CRD and wait for it before consuming events
    pub create_crd: bool,
    /// Interval between CRD bootstrap attempts
    pub init_retry_interval: Duration,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            cluster_wide: false,
            service_account: String::new(),
            create_crd: false,
            init_retry_interval: DEFAULT_INIT_RETRY_INTERVAL,
        }
    }
}

impl OperatorConfig {
    /// Retry policy for the CRD bootstrap loop
    pub fn bootstrap_retry(&self) -> RetryConfig {
        RetryConfig::fixed(self.init_retry_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_namespaced() {
        let config = OperatorConfig::default();
        assert!(!config.cluster_wide);
        assert!(!config.create_crd);
        assert_eq!(config.namespace, "default");
    }

    #[test]
    fn test_bootstrap_retry_is_fixed_and_unbounded() {
        let config = OperatorConfig {
            init_retry_interval: Duration::from_secs(7),
            ..Default::default()
        };
        let retry = config.bootstrap_retry();
        assert_eq!(retry.max_attempts, 0);
        assert_eq!(retry.initial_delay, Duration::from_secs(7));
        assert_eq!(retry.max_delay, Duration::from_secs(7));
        assert!(!retry.jitter);
    }
}
