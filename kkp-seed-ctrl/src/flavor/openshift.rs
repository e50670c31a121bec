use k8s_openapi::api::apps::v1 as appsv1;
use kkp_api::v1::{
    ClusterConditionType,
    ExtendedClusterHealth,
};
use kkp_core::prelude::*;
use kkp_core::reconciling::NamedCreator;
use kube::runtime::controller::Action;
use tokio::time::Duration;

use super::*;
use crate::errors::ClusterControllerError;

#[derive(Clone, Copy, Debug, Default)]
pub struct OpenshiftFlavor;

fn origin_image(data: &TemplateData) -> String {
    data.image(DEFAULT_QUAY_REGISTRY, &format!("openshift/origin-hyperkube:v{}", data.version()))
}

impl ClusterFlavor for OpenshiftFlavor {
    fn cluster_type(&self) -> ClusterType {
        ClusterType::Openshift
    }

    fn validate(&self, cluster: &Cluster) -> EmptyResult {
        if cluster.spec.openshift.is_none() {
            return Err(ClusterControllerError::openshift_spec_unset(&cluster.name_any()));
        }
        Ok(())
    }

    fn reconciling_condition(&self) -> ClusterConditionType {
        ClusterConditionType::OpenshiftControllerReconcilingSuccess
    }

    fn finalizers(&self) -> &'static [&'static str] {
        &[
            NODE_DELETION_FINALIZER,
            IMAGE_REGISTRY_CONFIG_CLEANUP_FINALIZER,
            CREDENTIALS_REQUESTS_CLEANUP_FINALIZER,
        ]
    }

    // Nothing watches the infrastructure status on behalf of this controller, so poll for it
    fn infra_gate_requeue(&self) -> Action {
        Action::requeue(Duration::from_secs(INFRA_RETRY_DELAY_SECONDS))
    }

    fn secrets<'a>(&self, data: &'a TemplateData<'a>) -> Vec<NamedCreator<'a, corev1::Secret>> {
        let mut creators = secrets::common_secrets(data);
        if let Some(spec) = data.cluster().spec.openshift.as_ref() {
            creators.push(secrets::openshift_image_pull_secret(data, &spec.image_pull_secret));
        }
        creators
    }

    fn config_maps<'a>(&self, data: &'a TemplateData<'a>) -> Vec<NamedCreator<'a, corev1::ConfigMap>> {
        let mut creators = configmaps::common_configmaps(data);
        creators.push(configmaps::openshift_apiserver_config(data));
        creators
    }

    // The OpenShift controller manager runs the scheduler in-process
    fn deployments<'a>(&self, data: &'a TemplateData<'a>) -> Vec<NamedCreator<'a, appsv1::Deployment>> {
        let image = origin_image(data);
        let mut creators = vec![
            workloads::openvpn_server(data),
            workloads::dns_resolver(data),
            workloads::apiserver(data, image.clone()),
            workloads::controller_manager(data, image),
            workloads::machine_controller(data),
            workloads::machine_controller_webhook(data),
            workloads::metrics_server(data),
            workloads::usercluster_controller(data),
        ];
        if cluster_autoscaler_wanted(data) {
            creators.push(workloads::cluster_autoscaler(data));
        }
        creators
    }

    fn finalize_health(&self, health: &mut ExtendedClusterHealth) {
        health.scheduler = health.controller;
    }
}
