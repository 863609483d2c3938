//! Kubernetes objects that make up one ZooKeeper ensemble
//!
//! Every ensemble is a StatefulSet fronted by a headless Service for peer
//! traffic and a ClusterIP Service for clients. Rendering is pure so it can be
//! tested without an API server.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{StatefulSet, StatefulSetSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, PodSpec, PodTemplateSpec, ResourceRequirements, Service,
    ServicePort, ServiceSpec,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, OwnerReference};
use kube::{Resource, ResourceExt};

use super::InstanceConfig;
use crate::crd::{ResourceSpec, ZookeeperCluster};
use crate::{CLIENT_PORT, ELECTION_PORT, PEER_PORT};

/// Name of the headless peer Service for `cluster`
pub fn headless_service_name(cluster: &str) -> String {
    format!("{cluster}-headless")
}

/// Name of the client Service for `cluster`
pub fn client_service_name(cluster: &str) -> String {
    format!("{cluster}-client")
}

/// Labels selecting every pod of `cluster`
pub fn selector_labels(cluster: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("app".to_string(), "zookeeper".to_string()),
        ("zookeeper_cluster".to_string(), cluster.to_string()),
    ])
}

/// Value for ZOO_SERVERS listing every member of a `size`-member ensemble
pub fn server_list(cluster: &str, namespace: &str, size: u32) -> String {
    let headless = headless_service_name(cluster);
    (0..size)
        .map(|ordinal| {
            format!(
                "server.{id}={cluster}-{ordinal}.{headless}.{namespace}.svc.cluster.local:{PEER_PORT}:{ELECTION_PORT};{CLIENT_PORT}",
                id = ordinal + 1,
            )
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Rendered objects for one ensemble
#[derive(Clone, Debug)]
pub struct EnsembleResources {
    /// Peer discovery Service
    pub headless_service: Service,
    /// Client-facing Service
    pub client_service: Service,
    /// Ensemble members
    pub stateful_set: StatefulSet,
}

impl EnsembleResources {
    /// Render the ensemble for `cluster`, whose spec must already be defaulted
    pub fn render(
        cluster: &ZookeeperCluster,
        namespace: &str,
        config: &InstanceConfig,
    ) -> Self {
        let name = cluster.name_any();
        let owner = cluster.controller_owner_ref(&());

        Self {
            headless_service: headless_service(&name, namespace, owner.clone()),
            client_service: client_service(&name, namespace, owner.clone()),
            stateful_set: stateful_set(cluster, &name, namespace, owner, config),
        }
    }
}

fn metadata(name: String, namespace: &str, cluster: &str, owner: Option<OwnerReference>) -> ObjectMeta {
    let mut labels = selector_labels(cluster);
    labels.insert(
        "app.kubernetes.io/managed-by".to_string(),
        "zookeeper-operator".to_string(),
    );
    ObjectMeta {
        name: Some(name),
        namespace: Some(namespace.to_string()),
        labels: Some(labels),
        owner_references: owner.map(|o| vec![o]),
        ..Default::default()
    }
}

fn port(name: &str, port: u16) -> ServicePort {
    ServicePort {
        name: Some(name.to_string()),
        port: i32::from(port),
        ..Default::default()
    }
}

fn headless_service(cluster: &str, namespace: &str, owner: Option<OwnerReference>) -> Service {
    Service {
        metadata: metadata(headless_service_name(cluster), namespace, cluster, owner),
        spec: Some(ServiceSpec {
            cluster_ip: Some("None".to_string()),
            publish_not_ready_addresses: Some(true),
            selector: Some(selector_labels(cluster)),
            ports: Some(vec![port("peer", PEER_PORT), port("leader-election", ELECTION_PORT)]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn client_service(cluster: &str, namespace: &str, owner: Option<OwnerReference>) -> Service {
    Service {
        metadata: metadata(client_service_name(cluster), namespace, cluster, owner),
        spec: Some(ServiceSpec {
            selector: Some(selector_labels(cluster)),
            ports: Some(vec![port("client", CLIENT_PORT)]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn resource_requirements(spec: &ResourceSpec) -> ResourceRequirements {
    let mut quantities = BTreeMap::new();
    if let Some(cpu) = &spec.cpu {
        quantities.insert("cpu".to_string(), Quantity(cpu.clone()));
    }
    if let Some(memory) = &spec.memory {
        quantities.insert("memory".to_string(), Quantity(memory.clone()));
    }
    ResourceRequirements {
        requests: Some(quantities.clone()),
        limits: Some(quantities),
        ..Default::default()
    }
}

fn container_port(name: &str, port: u16) -> ContainerPort {
    ContainerPort {
        name: Some(name.to_string()),
        container_port: i32::from(port),
        ..Default::default()
    }
}

fn stateful_set(
    cluster: &ZookeeperCluster,
    name: &str,
    namespace: &str,
    owner: Option<OwnerReference>,
    config: &InstanceConfig,
) -> StatefulSet {
    let spec = &cluster.spec;
    let pod = spec.pod.clone().unwrap_or_default();

    // Reserved keys are rejected by validation; selector labels still win here.
    let mut pod_labels = pod.labels.clone();
    pod_labels.extend(selector_labels(name));

    let container = Container {
        name: "zookeeper".to_string(),
        image: Some(spec.image()),
        command: Some(vec![
            "/bin/bash".to_string(),
            "-c".to_string(),
            "export ZOO_MY_ID=$((${HOSTNAME##*-}+1)) && exec /docker-entrypoint.sh zkServer.sh start-foreground".to_string(),
        ]),
        env: Some(vec![EnvVar {
            name: "ZOO_SERVERS".to_string(),
            value: Some(server_list(name, namespace, spec.size)),
            ..Default::default()
        }]),
        ports: Some(vec![
            container_port("client", CLIENT_PORT),
            container_port("peer", PEER_PORT),
            container_port("leader-election", ELECTION_PORT),
        ]),
        resources: pod
            .resources
            .as_ref()
            .filter(|r| !r.is_empty())
            .map(resource_requirements),
        ..Default::default()
    };

    StatefulSet {
        metadata: metadata(name.to_string(), namespace, name, owner),
        spec: Some(StatefulSetSpec {
            replicas: Some(i32::try_from(spec.size).unwrap_or(i32::MAX)),
            service_name: headless_service_name(name),
            pod_management_policy: Some("Parallel".to_string()),
            selector: LabelSelector {
                match_labels: Some(selector_labels(name)),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(pod_labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    node_selector: (!pod.node_selector.is_empty())
                        .then(|| pod.node_selector.clone()),
                    service_account_name: (!config.service_account.is_empty())
                        .then(|| config.service_account.clone()),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}
