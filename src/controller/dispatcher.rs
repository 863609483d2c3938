//! Reconciliation dispatcher
//!
//! Consumes one [`LifecycleEvent`] at a time and keeps the [`InstanceRegistry`]
//! consistent with the stream. For each event it:
//!
//! 1. Drops clusters this operator does not own.
//! 2. Quarantines failed clusters: a Deleted event releases them from the
//!    registry without tearing anything down, any other event is refused.
//! 3. Defaults and validates the spec.
//! 4. Translates the event into exactly one create/update/delete call on the
//!    [`InstanceController`], refusing events that contradict the registry.
//!
//! The dispatcher never retries. Every error goes back to the caller with the
//! registry untouched.

use std::sync::Arc;

use kube::ResourceExt;
use tracing::{debug, info, instrument};

use super::lifecycle::{quarantine, Quarantine};
use super::ownership::managed;
use super::registry::InstanceRegistry;
use super::{EventKind, LifecycleEvent};
use crate::config::OperatorConfig;
use crate::ensemble::{InstanceConfig, InstanceController};
use crate::metrics::ReconcileMetrics;
use crate::Error;

/// What the dispatcher did with an accepted event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// The cluster belongs to another operator instance
    Ignored,
    /// The event was applied
    Handled,
}

impl Disposition {
    /// Returns true if the cluster was not managed by this operator
    pub fn is_ignored(&self) -> bool {
        matches!(self, Self::Ignored)
    }
}

/// Event-at-a-time reconciler owning the registry of managed ensembles
///
/// `handle` takes `&mut self`, so events are serialised by construction.
pub struct Dispatcher<C: InstanceController> {
    config: OperatorConfig,
    controller: C,
    metrics: Arc<dyn ReconcileMetrics>,
    registry: InstanceRegistry<C::Handle>,
}

impl<C: InstanceController> Dispatcher<C> {
    /// Create a dispatcher with an empty registry
    pub fn new(config: OperatorConfig, controller: C, metrics: Arc<dyn ReconcileMetrics>) -> Self {
        Self::with_registry(config, controller, metrics, InstanceRegistry::new())
    }

    /// Create a dispatcher that starts from an existing registry
    pub fn with_registry(
        config: OperatorConfig,
        controller: C,
        metrics: Arc<dyn ReconcileMetrics>,
        registry: InstanceRegistry<C::Handle>,
    ) -> Self {
        Self {
            config,
            controller,
            metrics,
            registry,
        }
    }

    /// Read-only view of the managed ensembles
    pub fn registry(&self) -> &InstanceRegistry<C::Handle> {
        &self.registry
    }

    /// The wrapped instance controller
    pub fn controller(&self) -> &C {
        &self.controller
    }

    /// Config handed to the instance controller on creation
    fn instance_config(&self) -> InstanceConfig {
        InstanceConfig {
            service_account: self.config.service_account.clone(),
        }
    }

    /// Apply one lifecycle event
    ///
    /// Returns [`Disposition::Ignored`] for clusters owned by another operator
    /// instance. On error nothing in the registry has changed.
    #[instrument(skip(self, event), fields(cluster = %event.resource.name_any(), event = %event.kind))]
    pub async fn handle(&mut self, event: LifecycleEvent) -> Result<Disposition, Error> {
        let LifecycleEvent { kind, mut resource } = event;
        let name = resource.name_any();

        if !managed(&resource, &self.config) {
            debug!("cluster not managed by this operator");
            return Ok(Disposition::Ignored);
        }

        match quarantine(&resource, kind) {
            Quarantine::Clear => {}
            Quarantine::Release => {
                self.metrics.inc_failed();
                // The ensemble is presumed unrecoverable; nothing is torn down.
                if self.registry.remove(&name).is_some() {
                    info!("released failed cluster from management");
                }
                return Ok(Disposition::Handled);
            }
            Quarantine::Reject => {
                self.metrics.inc_failed();
                return Err(Error::FailedCluster { name });
            }
        }

        resource.spec.set_defaults();
        resource
            .spec
            .validate()
            .map_err(|e| Error::InvalidSpec(validation_detail(e)))?;

        match kind {
            EventKind::Added => {
                if self.registry.contains(&name) {
                    return Err(Error::AlreadyTracked { name, event: kind });
                }
                let handle = self
                    .controller
                    .create(&self.instance_config(), &resource)
                    .await?;
                self.registry.put(name, handle);
                self.metrics.inc_created();
                self.metrics.inc_total();
                info!("cluster created");
            }
            EventKind::Modified => {
                let handle = self
                    .registry
                    .get(&name)
                    .ok_or_else(|| Error::NeverTracked {
                        name: name.clone(),
                        event: kind,
                    })?;
                self.controller.update(handle, &resource).await?;
                self.metrics.inc_modified();
                debug!("cluster updated");
            }
            EventKind::Deleted => {
                let handle = self
                    .registry
                    .get(&name)
                    .ok_or_else(|| Error::NeverTracked {
                        name: name.clone(),
                        event: kind,
                    })?;
                self.controller.delete(handle).await?;
                self.registry.remove(&name);
                self.metrics.inc_deleted();
                self.metrics.dec_total();
                info!("cluster deleted");
            }
        }

        Ok(Disposition::Handled)
    }
}

/// Strip the generic prefix from a validation error
fn validation_detail(err: Error) -> String {
    match err {
        Error::Validation(msg) => msg,
        other => other.to_string(),
    }
}
