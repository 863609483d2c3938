//! Operator run loop
//!
//! Pulls watcher events one at a time, translates them and hands each
//! lifecycle event to the dispatcher. Errors are logged here and never
//! retried: the next event for the same cluster is the retry.

use futures::{Stream, StreamExt};
use kube::runtime::watcher::{self, Event};
use kube::{Api, Client, ResourceExt};
use tracing::{debug, info, warn};

use crate::config::OperatorConfig;
use crate::controller::{Dispatcher, Disposition, EventKind};
use crate::crd::ZookeeperCluster;
use crate::ensemble::InstanceController;
use crate::informer::EventTranslator;
use crate::WATCH_TIMEOUT_SECS;

/// Totals for one pass over an event stream
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Lifecycle events applied
    pub handled: u64,
    /// Lifecycle events for clusters owned elsewhere
    pub ignored: u64,
    /// Lifecycle events the dispatcher refused or failed
    pub failed: u64,
}

/// API handle scoped the way the operator is configured
pub fn watch_api(client: Client, config: &OperatorConfig) -> Api<ZookeeperCluster> {
    if config.cluster_wide {
        Api::all(client)
    } else {
        Api::namespaced(client, &config.namespace)
    }
}

/// Watcher configuration used for the cluster stream
pub fn watcher_config() -> watcher::Config {
    watcher::Config::default().timeout(WATCH_TIMEOUT_SECS)
}

/// Drives a dispatcher from a stream of watcher events
pub struct Operator<C: InstanceController> {
    dispatcher: Dispatcher<C>,
    translator: EventTranslator,
}

impl<C: InstanceController> Operator<C> {
    /// Create an operator around `dispatcher`
    pub fn new(dispatcher: Dispatcher<C>) -> Self {
        Self {
            dispatcher,
            translator: EventTranslator::new(),
        }
    }

    /// The wrapped dispatcher
    pub fn dispatcher(&self) -> &Dispatcher<C> {
        &self.dispatcher
    }

    /// Consume `events` until the stream ends
    ///
    /// Watcher errors are logged and skipped; pacing reconnects is left to the
    /// stream's own backoff.
    pub async fn run<S>(&mut self, events: S) -> RunSummary
    where
        S: Stream<Item = Result<Event<ZookeeperCluster>, watcher::Error>>,
    {
        let mut events = std::pin::pin!(events);
        let mut summary = RunSummary::default();

        info!("operator event loop started");
        while let Some(event) = events.next().await {
            match event {
                Ok(event) => self.dispatch(event, &mut summary).await,
                Err(e) => warn!(error = %e, "watcher error, will retry"),
            }
        }
        info!(
            handled = summary.handled,
            ignored = summary.ignored,
            failed = summary.failed,
            "operator event loop stopped"
        );

        summary
    }

    async fn dispatch(&mut self, event: Event<ZookeeperCluster>, summary: &mut RunSummary) {
        for lifecycle in self.translator.translate(event) {
            let name = lifecycle.resource.name_any();
            let kind = lifecycle.kind;

            match self.dispatcher.handle(lifecycle).await {
                Ok(Disposition::Handled) => summary.handled += 1,
                Ok(Disposition::Ignored) => {
                    debug!(cluster = %name, event = %kind, "cluster event ignored");
                    summary.ignored += 1;
                }
                Err(e) => {
                    warn!(cluster = %name, event = %kind, error = %e, "failed to handle cluster event");
                    summary.failed += 1;
                    // A refused Added leaves the registry as it was; resend the next snapshot as Added.
                    if kind == EventKind::Added {
                        self.translator.forget(&name);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use prometheus::Registry;

    use crate::crd::{ClusterPhase, ZookeeperClusterSpec, ZookeeperClusterStatus};
    use crate::ensemble::MockInstanceController;
    use crate::metrics::PrometheusMetrics;
    use crate::Error;

    fn cluster(name: &str, resource_version: &str) -> ZookeeperCluster {
        let mut cluster = ZookeeperCluster::new(name, ZookeeperClusterSpec::default());
        cluster.metadata.namespace = Some("default".to_string());
        cluster.metadata.resource_version = Some(resource_version.to_string());
        cluster
    }

    fn operator(controller: MockInstanceController) -> Operator<MockInstanceController> {
        let metrics = Arc::new(PrometheusMetrics::new(&Registry::new()).unwrap());
        Operator::new(Dispatcher::new(OperatorConfig::default(), controller, metrics))
    }

    /// Story: A cluster goes through its whole life on one watch stream
    #[tokio::test]
    async fn story_full_lifecycle_from_watch_stream() {
        let mut controller = MockInstanceController::new();
        controller.expect_create().times(1).returning(|_, _| Ok(1));
        controller.expect_update().times(1).returning(|_, _| Ok(()));
        controller.expect_delete().times(1).returning(|_| Ok(()));
        let mut operator = operator(controller);

        let events = futures::stream::iter(vec![
            Ok(Event::Init),
            Ok(Event::InitApply(cluster("zk", "1"))),
            Ok(Event::InitDone),
            Ok(Event::Apply(cluster("zk", "1"))),
            Ok(Event::Apply(cluster("zk", "2"))),
            Ok(Event::Delete(cluster("zk", "3"))),
        ]);

        let summary = operator.run(events).await;

        assert_eq!(
            summary,
            RunSummary {
                handled: 3,
                ignored: 0,
                failed: 0
            }
        );
        assert!(operator.dispatcher().registry().is_empty());
    }

    /// Story: A create that fails once is retried on the next snapshot
    #[tokio::test]
    async fn story_failed_create_is_retried_as_added() {
        let mut controller = MockInstanceController::new();
        let mut calls = 0;
        controller.expect_create().times(2).returning(move |_, _| {
            calls += 1;
            if calls == 1 {
                Err(Error::instance("status patch failed"))
            } else {
                Ok(1)
            }
        });
        controller.expect_update().times(1).returning(|_, _| Ok(()));
        let mut operator = operator(controller);

        let events = futures::stream::iter(vec![
            Ok(Event::Apply(cluster("zk", "1"))),
            Ok(Event::Apply(cluster("zk", "2"))),
            Ok(Event::Apply(cluster("zk", "3"))),
        ]);

        let summary = operator.run(events).await;

        assert_eq!(
            summary,
            RunSummary {
                handled: 2,
                ignored: 0,
                failed: 1
            }
        );
        assert_eq!(operator.dispatcher().registry().names(), vec!["zk"]);
    }

    /// Story: A spec fixed after a rejected create is provisioned
    #[tokio::test]
    async fn story_invalid_spec_then_fixed_is_created() {
        let mut controller = MockInstanceController::new();
        controller.expect_create().times(1).returning(|_, _| Ok(1));
        let mut operator = operator(controller);

        let mut oversized = cluster("zk", "1");
        oversized.spec.size = 99;

        let events = futures::stream::iter(vec![
            Ok(Event::Apply(oversized)),
            Ok(Event::Apply(cluster("zk", "2"))),
        ]);

        let summary = operator.run(events).await;

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.handled, 1);
        assert!(operator.dispatcher().registry().contains("zk"));
    }

    /// Story: Watcher errors are skipped without stalling the loop
    #[tokio::test(start_paused = true)]
    async fn story_watcher_errors_do_not_block() {
        let mut controller = MockInstanceController::new();
        controller.expect_create().times(1).returning(|_, _| Ok(1));
        let mut operator = operator(controller);

        let started = tokio::time::Instant::now();
        let events = futures::stream::iter(vec![
            Err(watcher::Error::NoResourceVersion),
            Ok(Event::Apply(cluster("zk", "1"))),
        ]);

        let summary = operator.run(events).await;

        assert_eq!(summary.handled, 1);
        assert_eq!(started.elapsed(), std::time::Duration::ZERO);
    }

    /// Story: One bad event does not stop the loop
    #[tokio::test]
    async fn story_errors_are_logged_and_loop_continues() {
        let mut controller = MockInstanceController::new();
        controller
            .expect_create()
            .times(2)
            .returning(|_, cluster| {
                if cluster.name_any() == "zk-bad" {
                    Err(Error::instance("apply failed"))
                } else {
                    Ok(1)
                }
            });
        let mut operator = operator(controller);

        let mut failed = cluster("zk-failed", "1");
        failed.status = Some(ZookeeperClusterStatus::with_phase(ClusterPhase::Failed));

        let events = futures::stream::iter(vec![
            Ok(Event::Apply(cluster("zk-bad", "1"))),
            Ok(Event::Apply(failed)),
            Ok(Event::Apply(cluster("zk-good", "1"))),
        ]);

        let summary = operator.run(events).await;

        assert_eq!(summary.failed, 2);
        assert_eq!(summary.handled, 1);
        assert_eq!(operator.dispatcher().registry().names(), vec!["zk-good"]);
    }
}
