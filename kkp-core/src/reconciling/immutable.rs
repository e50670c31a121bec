use k8s_openapi::api::apps::v1 as appsv1;
use k8s_openapi::api::batch::v1 as batchv1;
use k8s_openapi::api::policy::v1 as policyv1;
use k8s_openapi::api::rbac::v1 as rbacv1;
use kkp_api::autoscaling::VerticalPodAutoscaler;

use crate::k8s::NamespacedObject;
use crate::prelude::*;

// Object kinds the reconciler manages.  Kinds with fields the apiserver refuses to change after
// creation report those here, so that they can be deleted and recreated instead of updated.
pub trait ManagedResource: NamespacedObject {
    fn immutable_fields_changed(_existing: &Self, _desired: &Self) -> bool {
        false
    }
}

impl ManagedResource for corev1::Service {
    // Covers the ClusterIP <-> headless ("None") transition as well
    fn immutable_fields_changed(existing: &Self, desired: &Self) -> bool {
        let cluster_ip = |svc: &corev1::Service| {
            svc.spec
                .as_ref()
                .and_then(|s| s.cluster_ip.clone())
                .filter(|ip| !ip.is_empty())
        };
        match (cluster_ip(existing), cluster_ip(desired)) {
            (Some(e), Some(d)) => e != d,
            _ => false,
        }
    }
}

impl ManagedResource for appsv1::StatefulSet {
    fn immutable_fields_changed(existing: &Self, desired: &Self) -> bool {
        match (&existing.spec, &desired.spec) {
            (Some(e), Some(d)) => {
                e.selector != d.selector
                    || e.service_name != d.service_name
                    || e.volume_claim_templates != d.volume_claim_templates
            },
            _ => false,
        }
    }
}

impl ManagedResource for policyv1::PodDisruptionBudget {
    fn immutable_fields_changed(existing: &Self, desired: &Self) -> bool {
        let selector = |pdb: &policyv1::PodDisruptionBudget| pdb.spec.as_ref().and_then(|s| s.selector.clone());
        selector(existing) != selector(desired)
    }
}

impl ManagedResource for corev1::Secret {}
impl ManagedResource for corev1::ConfigMap {}
impl ManagedResource for corev1::ServiceAccount {}
impl ManagedResource for rbacv1::Role {}
impl ManagedResource for rbacv1::RoleBinding {}
impl ManagedResource for appsv1::Deployment {}
impl ManagedResource for batchv1::CronJob {}
impl ManagedResource for VerticalPodAutoscaler {}
