//! Reconciliation counters
//!
//! The dispatcher reports what it did through [`ReconcileMetrics`]. Production
//! wires in [`PrometheusMetrics`]; tests can read the same counters back.

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

use crate::Error;

/// Sink for the counters the dispatcher updates
pub trait ReconcileMetrics: Send + Sync {
    /// A cluster was created
    fn inc_created(&self);
    /// A cluster was updated
    fn inc_modified(&self);
    /// A cluster was torn down
    fn inc_deleted(&self);
    /// An event for a failed cluster was observed
    fn inc_failed(&self);
    /// One more cluster is under management
    fn inc_total(&self);
    /// One fewer cluster is under management
    fn dec_total(&self);
}

/// Prometheus-backed reconciliation counters
#[derive(Clone)]
pub struct PrometheusMetrics {
    /// Clusters created
    pub created: IntCounter,
    /// Clusters updated
    pub modified: IntCounter,
    /// Clusters deleted
    pub deleted: IntCounter,
    /// Events observed for failed clusters
    pub failed: IntCounter,
    /// Clusters currently managed
    pub total: IntGauge,
}

impl PrometheusMetrics {
    /// Create the counters and register them with `registry`
    pub fn new(registry: &Registry) -> Result<Self, Error> {
        let metrics = Self {
            created: IntCounter::new(
                "zookeeper_operator_clusters_created_total",
                "Total number of clusters created",
            )
            .map_err(metric_error)?,
            modified: IntCounter::new(
                "zookeeper_operator_clusters_modified_total",
                "Total number of clusters modified",
            )
            .map_err(metric_error)?,
            deleted: IntCounter::new(
                "zookeeper_operator_clusters_deleted_total",
                "Total number of clusters deleted",
            )
            .map_err(metric_error)?,
            failed: IntCounter::new(
                "zookeeper_operator_clusters_failed_total",
                "Total number of events seen for failed clusters",
            )
            .map_err(metric_error)?,
            total: IntGauge::new(
                "zookeeper_operator_clusters",
                "Number of clusters currently managed",
            )
            .map_err(metric_error)?,
        };

        registry
            .register(Box::new(metrics.created.clone()))
            .map_err(metric_error)?;
        registry
            .register(Box::new(metrics.modified.clone()))
            .map_err(metric_error)?;
        registry
            .register(Box::new(metrics.deleted.clone()))
            .map_err(metric_error)?;
        registry
            .register(Box::new(metrics.failed.clone()))
            .map_err(metric_error)?;
        registry
            .register(Box::new(metrics.total.clone()))
            .map_err(metric_error)?;

        Ok(metrics)
    }
}

impl ReconcileMetrics for PrometheusMetrics {
    fn inc_created(&self) {
        self.created.inc();
    }

    fn inc_modified(&self) {
        self.modified.inc();
    }

    fn inc_deleted(&self) {
        self.deleted.inc();
    }

    fn inc_failed(&self) {
        self.failed.inc();
    }

    fn inc_total(&self) {
        self.total.inc();
    }

    fn dec_total(&self) {
        self.total.dec();
    }
}

fn metric_error(e: prometheus::Error) -> Error {
    Error::metrics(e.to_string())
}

/// Render every metric in `registry` in the Prometheus text format
pub fn encode(registry: &Registry) -> Result<String, Error> {
    let mut buf = Vec::new();
    TextEncoder::new()
        .encode(&registry.gather(), &mut buf)
        .map_err(metric_error)?;
    String::from_utf8(buf).map_err(|e| Error::metrics(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_exported() {
        let registry = Registry::new();
        let metrics = PrometheusMetrics::new(&registry).unwrap();

        metrics.inc_created();
        metrics.inc_total();
        metrics.inc_failed();

        let text = encode(&registry).unwrap();
        assert!(text.contains("zookeeper_operator_clusters_created_total 1"));
        assert!(text.contains("zookeeper_operator_clusters_failed_total 1"));
        assert!(text.contains("zookeeper_operator_clusters 1"));
        assert!(text.contains("zookeeper_operator_clusters_deleted_total 0"));
    }

    #[test]
    fn test_total_gauge_goes_both_ways() {
        let metrics = PrometheusMetrics::new(&Registry::new()).unwrap();
        metrics.inc_total();
        metrics.inc_total();
        metrics.dec_total();
        assert_eq!(metrics.total.get(), 1);
    }

    #[test]
    fn test_double_registration_is_an_error() {
        let registry = Registry::new();
        PrometheusMetrics::new(&registry).unwrap();
        match PrometheusMetrics::new(&registry) {
            Err(Error::Metrics(msg)) => assert!(msg.contains("Duplicate")),
            Err(other) => panic!("Expected Metrics variant, got {other}"),
            Ok(_) => panic!("Expected duplicate registration to fail"),
        }
    }
}
