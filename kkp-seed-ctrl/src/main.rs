mod address;
mod config;
mod context;
mod controller;
mod convergence;
mod errors;
mod flavor;
mod health;
mod resources;
mod userclient;

use std::sync::Arc;

use clap::Parser;
use futures::{
    StreamExt,
    future,
};
use k8s_openapi::api::apps::v1 as appsv1;
use k8s_openapi::api::batch::v1 as batchv1;
use k8s_openapi::api::policy::v1 as policyv1;
use k8s_openapi::api::rbac::v1 as rbacv1;
use kkp_core::k8s::KubeObjectClient;
use kkp_core::logging::{
    self,
    LogFormat,
};
use kkp_core::prelude::*;
use kube::Api;
use kube::runtime::controller::{
    self as runtime,
    Controller,
};
use tracing::*;

use crate::config::{
    ControllerConfig,
    FeatureGates,
};
use crate::context::SeedContext;
use crate::controller::{
    error_policy,
    reconcile,
};
use crate::flavor::{
    ClusterFlavor,
    KubernetesFlavor,
    OpenshiftFlavor,
};

const KUBERNETES_CONTROLLER_NAME: &str = "kubermatic_kubernetes_controller";
const OPENSHIFT_CONTROLLER_NAME: &str = "kubermatic_openshift_controller";

#[derive(Clone, Debug, Parser)]
pub struct Options {
    #[arg(long, default_value = "")]
    pub seed_name: String,

    // Namespace the seed object and the kubermatic installation live in
    #[arg(long, default_value = "kubermatic")]
    pub namespace: String,

    // Only clusters with a matching worker-name label are reconciled
    #[arg(long, default_value = "")]
    pub worker_name: String,

    #[arg(long, default_value = "")]
    pub external_url: String,

    #[arg(long, default_value = "")]
    pub overwrite_registry: String,

    #[arg(long, default_value = "30000-32767")]
    pub node_port_range: String,

    #[arg(long, default_value = "10.254.0.0/16")]
    pub node_access_network: String,

    #[arg(long, default_value = "5Gi")]
    pub etcd_disk_size: String,

    #[arg(long)]
    pub docker_pull_config_json_file: Option<String>,

    #[arg(long)]
    pub ca_bundle_file: Option<String>,

    #[arg(long, default_value = "")]
    pub oidc_issuer_url: String,

    #[arg(long, default_value = "")]
    pub oidc_issuer_client_id: String,

    #[arg(long)]
    pub oidc_ca_file: Option<String>,

    #[arg(long, default_value = "quay.io/kubermatic/api")]
    pub kubermatic_image: String,

    #[arg(long, default_value = "quay.io/kubermatic/kubeletdnat-controller")]
    pub dnat_controller_image: String,

    // e.g. "VPA=true,EtcdDataCorruptionChecks=false"
    #[arg(long, default_value = "")]
    pub feature_gates: FeatureGates,

    #[arg(long, default_value_t = 5)]
    pub concurrent_cluster_updates: usize,

    #[arg(long, default_value_t = 4)]
    pub worker_count: u16,

    #[arg(short, long, default_value = "info")]
    pub verbosity: String,

    #[arg(long, default_value = "compact")]
    pub log_format: LogFormat,
}

async fn run_controller(
    client: kube::Client,
    config: Arc<ControllerConfig>,
    flavor: Arc<dyn ClusterFlavor>,
    controller_name: &str,
    worker_count: u16,
) {
    info!("starting {controller_name}");
    let ctx = SeedContext::new(KubeObjectClient::new(client.clone(), controller_name), config, flavor);

    Controller::new(Api::<Cluster>::all(client.clone()), Default::default())
        .with_config(runtime::Config::default().concurrency(worker_count))
        .owns(Api::<corev1::Service>::all(client.clone()), Default::default())
        .owns(Api::<corev1::Secret>::all(client.clone()), Default::default())
        .owns(Api::<corev1::ConfigMap>::all(client.clone()), Default::default())
        .owns(Api::<corev1::ServiceAccount>::all(client.clone()), Default::default())
        .owns(Api::<rbacv1::Role>::all(client.clone()), Default::default())
        .owns(Api::<rbacv1::RoleBinding>::all(client.clone()), Default::default())
        .owns(Api::<appsv1::Deployment>::all(client.clone()), Default::default())
        .owns(Api::<appsv1::StatefulSet>::all(client.clone()), Default::default())
        .owns(Api::<batchv1::CronJob>::all(client.clone()), Default::default())
        .owns(Api::<policyv1::PodDisruptionBudget>::all(client), Default::default())
        .run(reconcile, error_policy, Arc::new(ctx))
        .for_each(|_| future::ready(()))
        .await;
}

#[instrument(ret, err)]
async fn run(opts: Options) -> EmptyResult {
    let config = Arc::new(ControllerConfig::from_options(&opts)?);
    let client = kube::Client::try_default().await?;

    // Both flavors watch the same clusters and each ignores the ones that aren't its type
    future::join(
        run_controller(
            client.clone(),
            config.clone(),
            Arc::new(KubernetesFlavor),
            KUBERNETES_CONTROLLER_NAME,
            opts.worker_count,
        ),
        run_controller(client, config, Arc::new(OpenshiftFlavor), OPENSHIFT_CONTROLLER_NAME, opts.worker_count),
    )
    .await;
    Ok(())
}

#[tokio::main]
async fn main() -> EmptyResult {
    let args = Options::parse();
    logging::setup(&args.verbosity, args.log_format);
    run(args).await
}

#[cfg(test)]
mod tests;
