mod kubernetes;
mod openshift;

use k8s_openapi::api::apps::v1 as appsv1;
use k8s_openapi::api::batch::v1 as batchv1;
use k8s_openapi::api::policy::v1 as policyv1;
use k8s_openapi::api::rbac::v1 as rbacv1;
use kkp_api::v1::{
    ClusterConditionType,
    ExposeStrategy,
    ExtendedClusterHealth,
};
use kkp_core::prelude::*;
use kkp_core::reconciling::NamedCreator;
use kube::runtime::controller::Action;

pub use self::kubernetes::KubernetesFlavor;
pub use self::openshift::OpenshiftFlavor;
use crate::health::*;
use crate::resources::vpa::{
    VpaTarget,
    VpaTargetKind,
};
use crate::resources::*;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ClusterType {
    Kubernetes,
    Openshift,
}

// Everything that differs between a Kubernetes and an OpenShift control plane.  The convergence
// engine only ever talks to a cluster through one of these; the default methods hold the parts
// both flavors share.
pub trait ClusterFlavor: Send + Sync {
    fn cluster_type(&self) -> ClusterType;

    fn matches(&self, cluster: &Cluster) -> bool {
        let type_ = if cluster.is_openshift() { ClusterType::Openshift } else { ClusterType::Kubernetes };
        type_ == self.cluster_type()
    }

    fn validate(&self, _cluster: &Cluster) -> EmptyResult {
        Ok(())
    }

    fn reconciling_condition(&self) -> ClusterConditionType;

    // Cleanup finalizers, added once the user cluster is reachable
    fn finalizers(&self) -> &'static [&'static str];

    // What to do when convergence is blocked on the cloud provider infrastructure
    fn infra_gate_requeue(&self) -> Action;

    fn services<'a>(&self, data: &'a TemplateData<'a>) -> Vec<NamedCreator<'a, corev1::Service>> {
        let mut creators = vec![
            services::apiserver_internal(data),
            services::apiserver_external(data),
            services::openvpn_server(data),
            services::etcd(data),
            services::dns_resolver(data),
            services::machine_controller_webhook(data),
            services::metrics_server(data),
        ];
        if data.cluster().spec.expose_strategy == ExposeStrategy::LoadBalancer {
            creators.push(services::front_loadbalancer(data));
        }
        creators
    }

    fn secrets<'a>(&self, data: &'a TemplateData<'a>) -> Vec<NamedCreator<'a, corev1::Secret>>;

    fn service_accounts<'a>(&self, data: &'a TemplateData<'a>) -> Vec<NamedCreator<'a, corev1::ServiceAccount>> {
        rbac::service_accounts(data)
    }

    fn roles<'a>(&self, data: &'a TemplateData<'a>) -> Vec<NamedCreator<'a, rbacv1::Role>> {
        rbac::roles(data)
    }

    fn role_bindings<'a>(&self, data: &'a TemplateData<'a>) -> Vec<NamedCreator<'a, rbacv1::RoleBinding>> {
        rbac::role_bindings(data)
    }

    fn stateful_sets<'a>(&self, data: &'a TemplateData<'a>) -> Vec<NamedCreator<'a, appsv1::StatefulSet>> {
        vec![workloads::etcd(data)]
    }

    fn config_maps<'a>(&self, data: &'a TemplateData<'a>) -> Vec<NamedCreator<'a, corev1::ConfigMap>>;

    fn deployments<'a>(&self, data: &'a TemplateData<'a>) -> Vec<NamedCreator<'a, appsv1::Deployment>>;

    fn cron_jobs<'a>(&self, data: &'a TemplateData<'a>) -> Vec<NamedCreator<'a, batchv1::CronJob>> {
        vec![workloads::etcd_defragger(data)]
    }

    fn pod_disruption_budgets<'a>(
        &self,
        data: &'a TemplateData<'a>,
    ) -> Vec<NamedCreator<'a, policyv1::PodDisruptionBudget>> {
        pdb::control_plane_pdbs(data)
    }

    // Workloads that get a VerticalPodAutoscaler, if they exist
    fn vpa_targets<'a>(&self, data: &'a TemplateData<'a>) -> Vec<VpaTarget> {
        let deployments = self
            .deployments(data)
            .into_iter()
            .map(|c| VpaTarget { kind: VpaTargetKind::Deployment, name: c.name().into() });
        let stateful_sets = self
            .stateful_sets(data)
            .into_iter()
            .map(|c| VpaTarget { kind: VpaTargetKind::StatefulSet, name: c.name().into() });
        deployments.chain(stateful_sets).collect()
    }

    fn health_components(&self) -> Vec<HealthComponent> {
        vec![
            APISERVER_HEALTH,
            CONTROLLER_MANAGER_HEALTH,
            MACHINE_CONTROLLER_HEALTH,
            OPENVPN_HEALTH,
            USER_CLUSTER_CONTROLLER_HEALTH,
            ETCD_HEALTH,
        ]
    }

    fn finalize_health(&self, _health: &mut ExtendedClusterHealth) {}
}

pub(crate) fn cluster_autoscaler_wanted(data: &TemplateData) -> bool {
    data.cluster().cluster_autoscaler_enabled() && data.minor_version() > 13
}

#[cfg(test)]
mod tests;
