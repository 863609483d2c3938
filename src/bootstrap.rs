//! Resource type bootstrap
//!
//! Registers the ZookeeperCluster CRD and blocks until the API server reports it
//! established. Runs once at startup, before any event is dispatched, and is
//! retried on a fixed interval until it succeeds.

use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{Api, Patch, PatchParams};
use kube::runtime::wait::{await_condition, conditions};
use kube::{Client, CustomResourceExt};
use tracing::info;

#[cfg(test)]
use mockall::automock;

use crate::crd::ZookeeperCluster;
use crate::retry::{retry_with_backoff, RetryConfig};
use crate::{Error, CRD_NAME, FIELD_MANAGER};

/// Capability to register the managed resource type with the platform
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ResourceTypeRegistrar: Send + Sync {
    /// Create or update the resource type definition
    async fn register(&self) -> Result<(), Error>;

    /// Block until the resource type can be used
    async fn wait_ready(&self) -> Result<(), Error>;
}

/// Registers the ZookeeperCluster CRD using server-side apply
pub struct KubeCrdRegistrar {
    client: Client,
    ready_timeout: Duration,
}

impl KubeCrdRegistrar {
    /// Create a registrar that waits up to `ready_timeout` for the CRD
    pub fn new(client: Client, ready_timeout: Duration) -> Self {
        Self {
            client,
            ready_timeout,
        }
    }
}

#[async_trait]
impl ResourceTypeRegistrar for KubeCrdRegistrar {
    async fn register(&self) -> Result<(), Error> {
        let crds: Api<CustomResourceDefinition> = Api::all(self.client.clone());
        info!(crd = CRD_NAME, "installing CRD");
        crds.patch(
            CRD_NAME,
            &PatchParams::apply(FIELD_MANAGER).force(),
            &Patch::Apply(&ZookeeperCluster::crd()),
        )
        .await
        .map_err(|e| Error::bootstrap(format!("failed to create CRD: {e}")))?;
        Ok(())
    }

    async fn wait_ready(&self) -> Result<(), Error> {
        let crds: Api<CustomResourceDefinition> = Api::all(self.client.clone());
        let established = await_condition(crds, CRD_NAME, conditions::is_crd_established());

        tokio::time::timeout(self.ready_timeout, established)
            .await
            .map_err(|_| {
                Error::bootstrap(format!(
                    "CRD {CRD_NAME} not established within {}s",
                    self.ready_timeout.as_secs()
                ))
            })?
            .map_err(|e| Error::bootstrap(format!("waiting for CRD {CRD_NAME}: {e}")))?;

        info!(crd = CRD_NAME, "CRD established");
        Ok(())
    }
}

/// Register the resource type and wait for it, retrying per `retry`
pub async fn bootstrap<R>(registrar: &R, retry: &RetryConfig) -> Result<(), Error>
where
    R: ResourceTypeRegistrar + ?Sized,
{
    retry_with_backoff(retry, "init_crd", || async move {
        registrar.register().await?;
        registrar.wait_ready().await
    })
    .await
}
