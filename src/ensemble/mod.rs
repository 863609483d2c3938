//! Instance controllers
//!
//! An [`InstanceController`] provisions, updates and tears down one ensemble.
//! The dispatcher only sees this trait; [`KubeEnsembleController`] is the
//! production variant that drives the Kubernetes API.

mod resources;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::Service;
use kube::api::{Api, DeleteParams, Patch, PatchParams};
use kube::{Client, ResourceExt};
use tracing::{debug, info, warn};

#[cfg(test)]
use mockall::automock;

pub use resources::{
    client_service_name, headless_service_name, selector_labels, server_list, EnsembleResources,
};

use crate::crd::{ClusterPhase, ZookeeperCluster, ZookeeperClusterStatus};
use crate::{Error, FIELD_MANAGER};

/// Configuration derived from the operator config and handed to every ensemble
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InstanceConfig {
    /// Service account the ensemble pods run as (empty = namespace default)
    pub service_account: String,
}

/// Capability to provision and manage ensembles
///
/// `create` is called at most once per name before the matching `delete`.
#[cfg_attr(test, automock(type Handle = u64;))]
#[async_trait]
pub trait InstanceController: Send + Sync {
    /// Opaque reference to a provisioned ensemble
    type Handle: Send + Sync;

    /// Provision a new ensemble for `cluster`
    async fn create(
        &self,
        config: &InstanceConfig,
        cluster: &ZookeeperCluster,
    ) -> Result<Self::Handle, Error>;

    /// Reconcile an existing ensemble toward the new desired state
    async fn update(&self, handle: &Self::Handle, cluster: &ZookeeperCluster)
        -> Result<(), Error>;

    /// Tear the ensemble down
    async fn delete(&self, handle: &Self::Handle) -> Result<(), Error>;
}

/// Reference to an ensemble provisioned by [`KubeEnsembleController`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnsembleHandle {
    /// Cluster name (also the StatefulSet name)
    pub name: String,
    /// Namespace holding the ensemble objects
    pub namespace: String,
    /// Config the ensemble was created with
    pub config: InstanceConfig,
}

/// Instance controller backed by the Kubernetes API
pub struct KubeEnsembleController {
    client: Client,
}

impl KubeEnsembleController {
    /// Create a new controller wrapping the given kube Client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn apply(&self, resources: &EnsembleResources, namespace: &str) -> Result<(), Error> {
        let params = PatchParams::apply(FIELD_MANAGER).force();
        let services: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        let sets: Api<StatefulSet> = Api::namespaced(self.client.clone(), namespace);

        for service in [&resources.headless_service, &resources.client_service] {
            let name = service.name_any();
            services.patch(&name, &params, &Patch::Apply(service)).await?;
            debug!(service = %name, "applied service");
        }

        let name = resources.stateful_set.name_any();
        sets.patch(&name, &params, &Patch::Apply(&resources.stateful_set))
            .await?;
        debug!(statefulset = %name, "applied statefulset");

        Ok(())
    }

    async fn patch_status(
        &self,
        name: &str,
        namespace: &str,
        status: &ZookeeperClusterStatus,
    ) -> Result<(), Error> {
        let api: Api<ZookeeperCluster> = Api::namespaced(self.client.clone(), namespace);
        let patch = serde_json::json!({ "status": status });
        api.patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }
}

/// Namespace of `cluster`, which must be set for a namespaced resource
fn namespace_of(cluster: &ZookeeperCluster) -> Result<String, Error> {
    cluster
        .namespace()
        .ok_or_else(|| Error::instance(format!("cluster {} has no namespace", cluster.name_any())))
}

/// Delete a namespaced object, treating NotFound as already deleted
async fn delete_ignoring_missing<K>(api: &Api<K>, name: &str) -> Result<(), Error>
where
    K: kube::Resource + Clone + serde::de::DeserializeOwned + std::fmt::Debug,
{
    match api.delete(name, &DeleteParams::background()).await {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(ae)) if ae.code == 404 => {
            debug!(%name, "already deleted");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl InstanceController for KubeEnsembleController {
    type Handle = EnsembleHandle;

    async fn create(
        &self,
        config: &InstanceConfig,
        cluster: &ZookeeperCluster,
    ) -> Result<EnsembleHandle, Error> {
        let name = cluster.name_any();
        let namespace = namespace_of(cluster)?;
        info!(cluster = %name, %namespace, size = cluster.spec.size, "creating ensemble");

        self.patch_status(
            &name,
            &namespace,
            &ZookeeperClusterStatus::with_phase(ClusterPhase::Creating),
        )
        .await?;

        let resources = EnsembleResources::render(cluster, &namespace, config);
        if let Err(e) = self.apply(&resources, &namespace).await {
            let failed = ZookeeperClusterStatus::with_phase(ClusterPhase::Failed)
                .reason(format!("failed to create ensemble: {e}"));
            if let Err(status_err) = self.patch_status(&name, &namespace, &failed).await {
                warn!(cluster = %name, error = %status_err, "failed to record Failed status");
            }
            return Err(Error::instance(format!("create {name}: {e}")));
        }

        self.patch_status(
            &name,
            &namespace,
            &ZookeeperClusterStatus::with_phase(ClusterPhase::Running)
                .members(cluster.spec.size, cluster.spec.version.clone()),
        )
        .await?;

        info!(cluster = %name, "ensemble created");
        Ok(EnsembleHandle {
            name,
            namespace,
            config: config.clone(),
        })
    }

    async fn update(&self, handle: &EnsembleHandle, cluster: &ZookeeperCluster) -> Result<(), Error> {
        info!(cluster = %handle.name, size = cluster.spec.size, version = %cluster.spec.version, "updating ensemble");

        let resources = EnsembleResources::render(cluster, &handle.namespace, &handle.config);
        self.apply(&resources, &handle.namespace)
            .await
            .map_err(|e| Error::instance(format!("update {}: {e}", handle.name)))?;

        self.patch_status(
            &handle.name,
            &handle.namespace,
            &ZookeeperClusterStatus::with_phase(ClusterPhase::Running)
                .members(cluster.spec.size, cluster.spec.version.clone()),
        )
        .await
    }

    async fn delete(&self, handle: &EnsembleHandle) -> Result<(), Error> {
        info!(cluster = %handle.name, "deleting ensemble");

        let sets: Api<StatefulSet> = Api::namespaced(self.client.clone(), &handle.namespace);
        let services: Api<Service> = Api::namespaced(self.client.clone(), &handle.namespace);

        delete_ignoring_missing(&sets, &handle.name).await?;
        delete_ignoring_missing(&services, &client_service_name(&handle.name)).await?;
        delete_ignoring_missing(&services, &headless_service_name(&handle.name)).await?;

        info!(cluster = %handle.name, "ensemble deleted");
        Ok(())
    }
}
