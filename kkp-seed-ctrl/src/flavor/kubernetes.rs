use k8s_openapi::api::apps::v1 as appsv1;
use kkp_api::v1::ClusterConditionType;
use kkp_core::prelude::*;
use kkp_core::reconciling::NamedCreator;
use kube::runtime::controller::Action;

use super::*;

#[derive(Clone, Copy, Debug, Default)]
pub struct KubernetesFlavor;

fn hyperkube_image(data: &TemplateData) -> String {
    data.image(DEFAULT_K8S_REGISTRY, &format!("hyperkube-amd64:v{}", data.version()))
}

impl ClusterFlavor for KubernetesFlavor {
    fn cluster_type(&self) -> ClusterType {
        ClusterType::Kubernetes
    }

    fn reconciling_condition(&self) -> ClusterConditionType {
        ClusterConditionType::ClusterControllerReconcilingSuccess
    }

    fn finalizers(&self) -> &'static [&'static str] {
        &[NODE_DELETION_FINALIZER]
    }

    // The health controller updates the infrastructure status, which triggers a new reconcile
    fn infra_gate_requeue(&self) -> Action {
        Action::await_change()
    }

    fn secrets<'a>(&self, data: &'a TemplateData<'a>) -> Vec<NamedCreator<'a, corev1::Secret>> {
        let mut creators = secrets::common_secrets(data);
        creators.push(secrets::kubeconfig(
            data,
            names::SCHEDULER_KUBECONFIG_SECRET_NAME,
            names::SCHEDULER_USERNAME,
            secrets::ApiserverEndpoint::Internal,
        ));
        creators
    }

    fn config_maps<'a>(&self, data: &'a TemplateData<'a>) -> Vec<NamedCreator<'a, corev1::ConfigMap>> {
        configmaps::common_configmaps(data)
    }

    fn deployments<'a>(&self, data: &'a TemplateData<'a>) -> Vec<NamedCreator<'a, appsv1::Deployment>> {
        let image = hyperkube_image(data);
        let mut creators = vec![
            workloads::openvpn_server(data),
            workloads::dns_resolver(data),
            workloads::apiserver(data, image.clone()),
            workloads::scheduler(data, image.clone()),
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

    fn health_components(&self) -> Vec<HealthComponent> {
        vec![
            APISERVER_HEALTH,
            CONTROLLER_MANAGER_HEALTH,
            SCHEDULER_HEALTH,
            MACHINE_CONTROLLER_HEALTH,
            OPENVPN_HEALTH,
            USER_CLUSTER_CONTROLLER_HEALTH,
            ETCD_HEALTH,
        ]
    }
}
