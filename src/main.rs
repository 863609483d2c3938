//! ZooKeeper Operator - Kubernetes lifecycle management for ZooKeeper ensembles

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use kube::runtime::{watcher, WatchStreamExt};
use kube::{Client, CustomResourceExt};
use prometheus::Registry;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use zookeeper_operator::bootstrap::{bootstrap, KubeCrdRegistrar};
use zookeeper_operator::config::OperatorConfig;
use zookeeper_operator::controller::Dispatcher;
use zookeeper_operator::crd::ZookeeperCluster;
use zookeeper_operator::ensemble::KubeEnsembleController;
use zookeeper_operator::metrics::PrometheusMetrics;
use zookeeper_operator::operator::{watch_api, watcher_config, Operator};
use zookeeper_operator::server;

/// ZooKeeper operator - CRD-driven Kubernetes operator for ZooKeeper ensembles
#[derive(Parser, Debug)]
#[command(name = "zookeeper-operator", version, about, long_about = None)]
struct Cli {
    /// Generate CRD manifest and exit
    #[arg(long)]
    crd: bool,

    /// Namespace to watch when not running cluster-wide
    #[arg(long, env = "MY_POD_NAMESPACE", default_value = "default")]
    namespace: String,

    /// Manage clusters annotated with the cluster-wide scope in every namespace
    #[arg(long, env = "CLUSTER_WIDE")]
    cluster_wide: bool,

    /// Service account the ensemble pods run as
    #[arg(long, env = "SERVICE_ACCOUNT", default_value = "")]
    service_account: String,

    /// Register the CRD and wait for it before watching
    #[arg(long, env = "CREATE_CRD", default_value_t = true, action = clap::ArgAction::Set)]
    create_crd: bool,

    /// Seconds between CRD registration attempts
    #[arg(long, default_value = "30")]
    init_retry_secs: u64,

    /// Seconds to wait for the CRD to become established on each attempt
    #[arg(long, default_value = "60")]
    crd_ready_timeout_secs: u64,

    /// Listen address for /metrics and /healthz
    #[arg(long, env = "METRICS_ADDR", default_value = "0.0.0.0:8080")]
    metrics_addr: SocketAddr,
}

impl Cli {
    fn operator_config(&self) -> OperatorConfig {
        OperatorConfig {
            namespace: self.namespace.clone(),
            cluster_wide: self.cluster_wide,
            service_account: self.service_account.clone(),
            create_crd: self.create_crd,
            init_retry_interval: Duration::from_secs(self.init_retry_secs),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if cli.crd {
        let crd = serde_yaml::to_string(&ZookeeperCluster::crd())
            .map_err(|e| anyhow::anyhow!("Failed to serialize CRD: {}", e))?;
        println!("{crd}");
        return Ok(());
    }

    run_controller(cli).await
}

/// Run the operator until the watch ends or a shutdown signal arrives
async fn run_controller(cli: Cli) -> anyhow::Result<()> {
    let config = cli.operator_config();
    let client = Client::try_default()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Kubernetes client: {}", e))?;

    tracing::info!(
        namespace = %config.namespace,
        cluster_wide = config.cluster_wide,
        "starting zookeeper operator"
    );

    if config.create_crd {
        let registrar = KubeCrdRegistrar::new(
            client.clone(),
            Duration::from_secs(cli.crd_ready_timeout_secs),
        );
        bootstrap(&registrar, &config.bootstrap_retry()).await?;
    }

    let registry = Arc::new(Registry::new());
    let metrics = Arc::new(PrometheusMetrics::new(&registry)?);

    let metrics_addr = cli.metrics_addr;
    tokio::spawn(async move {
        if let Err(e) = server::serve(metrics_addr, registry).await {
            tracing::error!(error = %e, "metrics server stopped");
        }
    });

    let api = watch_api(client.clone(), &config);
    let dispatcher = Dispatcher::new(config, KubeEnsembleController::new(client), metrics);
    let mut operator = Operator::new(dispatcher);

    let events = watcher::watcher(api, watcher_config()).default_backoff();

    tokio::select! {
        summary = operator.run(events) => {
            tracing::info!(?summary, "watch stream ended");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    Ok(())
}
